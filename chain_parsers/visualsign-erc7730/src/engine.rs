//! Rendering pipeline: walks a display format's fields over decoded arguments
//! and produces a [`DisplayModel`].

use std::borrow::Cow;
use std::collections::HashMap;

use serde::Serialize;
use tracing::{debug, warn};

use crate::abi_decoder::{ArgumentValue, DecodedArguments};
use crate::address_book::AddressBook;
use crate::error::{RenderError, RenderWarning};
use crate::formatters;
use crate::options::RenderOptions;
use crate::path::{self, Container, path_key};
use crate::resolver::TokenSource;
use crate::types::{
    Descriptor, DisplayField, DisplayFormat, FieldGroup, FieldReference, FormatParams, Iteration,
    SimpleField,
};
use crate::visibility::is_visible;

/// Human-readable rendering of one call or message
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayModel {
    pub intent: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interpolated_intent: Option<String>,
    pub entries: Vec<DisplayEntry>,
    /// Non-fatal conditions, in the order they were encountered
    pub warnings: Vec<RenderWarning>,
}

impl DisplayModel {
    /// All items, depth first, groups flattened
    pub fn items(&self) -> Vec<&DisplayItem> {
        fn collect<'m>(entries: &'m [DisplayEntry], out: &mut Vec<&'m DisplayItem>) {
            for entry in entries {
                match entry {
                    DisplayEntry::Item(item) => out.push(item),
                    DisplayEntry::Group(group) => collect(&group.entries, out),
                }
            }
        }
        let mut out = Vec::new();
        collect(&self.entries, &mut out);
        out
    }

    /// First item with the given label
    pub fn item(&self, label: &str) -> Option<&DisplayItem> {
        self.items().into_iter().find(|item| item.label == label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum DisplayEntry {
    Item(DisplayItem),
    Group(DisplayGroup),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DisplayItem {
    pub label: String,
    pub value: String,
    /// False only for hidden fields emitted because of `include_hidden`
    pub visible: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DisplayGroup {
    pub label: String,
    pub iteration: Iteration,
    pub entries: Vec<DisplayEntry>,
}

/// State of a single render call
pub struct RenderContext<'a> {
    pub(crate) descriptor: &'a Descriptor,
    pub(crate) decoded: &'a DecodedArguments,
    pub(crate) container: Container,
    pub(crate) tokens: &'a dyn TokenSource,
    pub(crate) address_book: &'a AddressBook,
    pub(crate) options: &'a RenderOptions,
    warnings: Vec<RenderWarning>,
    /// Rendered text by normalized path, for intent interpolation
    rendered: HashMap<String, String>,
}

impl<'a> RenderContext<'a> {
    pub fn new(
        descriptor: &'a Descriptor,
        decoded: &'a DecodedArguments,
        container: Container,
        tokens: &'a dyn TokenSource,
        address_book: &'a AddressBook,
        options: &'a RenderOptions,
    ) -> Self {
        Self {
            descriptor,
            decoded,
            container,
            tokens,
            address_book,
            options,
            warnings: Vec::new(),
            rendered: HashMap::new(),
        }
    }

    /// Renders every field of `format`, in declaration order
    pub fn render(mut self, format: &DisplayFormat) -> Result<DisplayModel, RenderError> {
        let mut entries = Vec::new();
        let mut chain = Vec::new();
        for field in &format.fields {
            self.render_field(field, &mut chain, &mut entries)?;
        }

        let intent = format
            .intent
            .clone()
            .unwrap_or_else(|| self.decoded.name.clone());
        let interpolated_intent = format
            .interpolated_intent
            .as_deref()
            .and_then(|template| self.interpolate(template));
        debug!(
            intent = %intent,
            entries = entries.len(),
            warnings = self.warnings.len(),
            "rendered display model"
        );

        Ok(DisplayModel {
            intent,
            interpolated_intent,
            entries,
            warnings: self.warnings,
        })
    }

    pub(crate) fn resolve(&self, path: &str) -> Result<Cow<'a, ArgumentValue>, RenderError> {
        path::resolve(path, self.decoded, &self.container)
    }

    pub(crate) fn warn(&mut self, warning: RenderWarning) {
        warn!(%warning, "render warning");
        self.warnings.push(warning);
    }

    #[cfg(test)]
    pub(crate) fn into_warnings(self) -> Vec<RenderWarning> {
        self.warnings
    }

    fn render_field(
        &mut self,
        field: &DisplayField,
        chain: &mut Vec<String>,
        out: &mut Vec<DisplayEntry>,
    ) -> Result<(), RenderError> {
        match field {
            DisplayField::Simple(simple) => self.render_simple(simple, out),
            DisplayField::Group(group) => self.render_group(group, chain, out),
            DisplayField::Reference(reference) => self.render_reference(reference, chain, out),
        }
    }

    fn render_group(
        &mut self,
        group: &FieldGroup,
        chain: &mut Vec<String>,
        out: &mut Vec<DisplayEntry>,
    ) -> Result<(), RenderError> {
        let mut entries = Vec::new();
        for field in &group.fields {
            self.render_field(field, chain, &mut entries)?;
        }
        if !entries.is_empty() {
            out.push(DisplayEntry::Group(DisplayGroup {
                label: group.label.clone(),
                iteration: group.iteration,
                entries,
            }));
        }
        Ok(())
    }

    fn render_reference(
        &mut self,
        reference: &FieldReference,
        chain: &mut Vec<String>,
        out: &mut Vec<DisplayEntry>,
    ) -> Result<(), RenderError> {
        let name = reference.definition_name();
        if chain.iter().any(|seen| seen == name) {
            return Err(RenderError::ReferenceCycle(name.to_string()));
        }
        let limit = self.options.max_reference_depth;
        if chain.len() >= limit {
            return Err(RenderError::ReferenceDepthExceeded {
                name: name.to_string(),
                limit,
            });
        }
        let descriptor = self.descriptor;
        let definition = descriptor
            .display
            .definitions
            .get(name)
            .ok_or_else(|| RenderError::UndefinedReference(reference.reference.clone()))?;

        chain.push(name.to_string());
        let result = match definition {
            DisplayField::Simple(simple) => {
                let merged = SimpleField {
                    path: reference.path.clone().or_else(|| simple.path.clone()),
                    label: reference.label.clone().unwrap_or_else(|| simple.label.clone()),
                    format: reference.format.clone().or_else(|| simple.format.clone()),
                    params: merge_params(simple.params.as_ref(), reference.params.as_ref()),
                    visible: reference.visible.clone().or_else(|| simple.visible.clone()),
                };
                self.render_simple(&merged, out)
            }
            DisplayField::Group(group) => match &reference.label {
                Some(label) => {
                    let relabelled = FieldGroup {
                        label: label.clone(),
                        ..group.clone()
                    };
                    self.render_group(&relabelled, chain, out)
                }
                None => self.render_group(group, chain, out),
            },
            DisplayField::Reference(inner) => {
                let merged = FieldReference {
                    reference: inner.reference.clone(),
                    path: reference.path.clone().or_else(|| inner.path.clone()),
                    label: reference.label.clone().or_else(|| inner.label.clone()),
                    format: reference.format.clone().or_else(|| inner.format.clone()),
                    params: merge_params(inner.params.as_ref(), reference.params.as_ref()),
                    visible: reference.visible.clone().or_else(|| inner.visible.clone()),
                };
                self.render_reference(&merged, chain, out)
            }
        };
        chain.pop();
        result
    }

    fn render_simple(
        &mut self,
        field: &SimpleField,
        out: &mut Vec<DisplayEntry>,
    ) -> Result<(), RenderError> {
        let path = field.path.as_deref();
        let visible = is_visible(self, field.visible.as_ref(), path)?;
        if !visible && !self.options.include_hidden {
            return Ok(());
        }
        let path = path.ok_or_else(|| RenderError::MissingPath {
            label: field.label.clone(),
        })?;

        let value = self.resolve(path)?;
        let text = formatters::render(self, &value, field.format.as_ref(), field.params.as_ref(), path)?;
        if visible {
            self.rendered
                .entry(path_key(path).to_string())
                .or_insert_with(|| text.clone());
        }
        out.push(DisplayEntry::Item(DisplayItem {
            label: field.label.clone(),
            value: text,
            visible,
        }));
        Ok(())
    }

    /// Substitutes `${path}` placeholders; `None` when one cannot be filled
    fn interpolate(&mut self, template: &str) -> Option<String> {
        let mut result = String::with_capacity(template.len());
        let mut rest = template;
        while let Some(start) = rest.find("${") {
            result.push_str(&rest[..start]);
            let after = &rest[start + 2..];
            let Some(end) = after.find('}') else {
                self.warn(RenderWarning::IntentInterpolation(format!(
                    "unterminated placeholder in `{template}`"
                )));
                return None;
            };
            let placeholder = after[..end].trim();
            let text = match self.rendered.get(path_key(placeholder)) {
                Some(text) => text.clone(),
                None => match self.resolve(placeholder) {
                    Ok(value) => value.to_string(),
                    Err(e) => {
                        self.warn(RenderWarning::IntentInterpolation(format!(
                            "`${{{placeholder}}}`: {e}"
                        )));
                        return None;
                    }
                },
            };
            result.push_str(&text);
            rest = &after[end + 1..];
        }
        result.push_str(rest);
        Some(result)
    }
}

/// Parameters of a definition with those set on the referencing field applied on top
fn merge_params(base: Option<&FormatParams>, overrides: Option<&FormatParams>) -> Option<FormatParams> {
    let (base, overrides) = match (base, overrides) {
        (None, None) => return None,
        (Some(base), None) => return Some(base.clone()),
        (None, Some(overrides)) => return Some(overrides.clone()),
        (Some(base), Some(overrides)) => (base, overrides),
    };
    let overrides = overrides.clone();
    Some(FormatParams {
        token_path: overrides.token_path.or_else(|| base.token_path.clone()),
        token: overrides.token.or(base.token),
        native_currency_address: if overrides.native_currency_address.is_empty() {
            base.native_currency_address.clone()
        } else {
            overrides.native_currency_address
        },
        chain_id: overrides.chain_id.or(base.chain_id),
        chain_id_path: overrides.chain_id_path.or_else(|| base.chain_id_path.clone()),
        threshold: overrides.threshold.or_else(|| base.threshold.clone()),
        message: overrides.message.or_else(|| base.message.clone()),
        decimals: overrides.decimals.or(base.decimals),
        enum_path: overrides.enum_path.or_else(|| base.enum_path.clone()),
        map_reference: overrides.map_reference.or_else(|| base.map_reference.clone()),
        encryption: overrides.encryption.or_else(|| base.encryption.clone()),
    })
}
