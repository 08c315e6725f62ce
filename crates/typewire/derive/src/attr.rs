//! `#[record(...)]` attribute parsing.

use syn::{Attribute, LitStr, Path, Result};

pub(crate) const RECORD_ATTRIBUTE_NAME: &str = "record";

// -----------------------------------------------------------------------------
// Container attributes

#[derive(Default)]
pub(crate) struct ContainerAttrs {
    pub rename: Option<String>,
    pub rename_all: Option<syn::Ident>,
    pub tag: Option<String>,
    pub content: Option<String>,
    pub untagged: bool,
    pub transparent: bool,
    pub deny_unknown_fields: bool,
    pub skip_if_default: bool,
    pub auto_register: bool,
}

impl ContainerAttrs {
    pub fn parse(attrs: &[Attribute]) -> Result<Self> {
        let mut out = Self::default();
        for attr in attrs {
            if !attr.path().is_ident(RECORD_ATTRIBUTE_NAME) {
                continue;
            }
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("rename") {
                    out.rename = Some(meta.value()?.parse::<LitStr>()?.value());
                } else if meta.path.is_ident("rename_all") {
                    let lit: LitStr = meta.value()?.parse()?;
                    out.rename_all = Some(name_rule_variant(&lit)?);
                } else if meta.path.is_ident("tag") {
                    out.tag = Some(meta.value()?.parse::<LitStr>()?.value());
                } else if meta.path.is_ident("content") {
                    out.content = Some(meta.value()?.parse::<LitStr>()?.value());
                } else if meta.path.is_ident("untagged") {
                    out.untagged = true;
                } else if meta.path.is_ident("transparent") {
                    out.transparent = true;
                } else if meta.path.is_ident("deny_unknown_fields") {
                    out.deny_unknown_fields = true;
                } else if meta.path.is_ident("skip_if_default") {
                    out.skip_if_default = true;
                } else if meta.path.is_ident("auto_register") {
                    out.auto_register = true;
                } else {
                    return Err(meta.error("unknown record attribute"));
                }
                Ok(())
            })?;
        }
        if out.untagged && (out.tag.is_some() || out.content.is_some()) {
            return Err(syn::Error::new(
                proc_macro2::Span::call_site(),
                "`untagged` cannot be combined with `tag`/`content`",
            ));
        }
        if out.content.is_some() && out.tag.is_none() {
            return Err(syn::Error::new(
                proc_macro2::Span::call_site(),
                "`content` requires `tag`",
            ));
        }
        Ok(out)
    }
}

/// Maps the serde-style spelling to the engine's `NameRule` variant.
fn name_rule_variant(lit: &LitStr) -> Result<syn::Ident> {
    let variant = match lit.value().as_str() {
        "lowercase" => "Lower",
        "UPPERCASE" => "Upper",
        "camelCase" => "Camel",
        "PascalCase" => "Pascal",
        "snake_case" => "Snake",
        "SCREAMING_SNAKE_CASE" => "ScreamingSnake",
        "kebab-case" => "Kebab",
        "SCREAMING-KEBAB-CASE" => "ScreamingKebab",
        other => {
            return Err(syn::Error::new(
                lit.span(),
                format!("unknown rename_all convention `{other}`"),
            ))
        }
    };
    Ok(syn::Ident::new(variant, lit.span()))
}

// -----------------------------------------------------------------------------
// Field attributes

pub(crate) enum DefaultAttr {
    None,
    /// `default`: the field type's `Default` impl.
    Trait,
    /// `default = "path"`: a factory function.
    Path(Path),
}

pub(crate) struct FieldAttrs {
    pub rename: Option<String>,
    pub aliases: Vec<String>,
    pub skip: bool,
    pub skip_serializing: bool,
    pub skip_deserializing: bool,
    pub skip_serializing_if: Option<Path>,
    pub skip_if_default: bool,
    pub default: DefaultAttr,
    pub flatten: bool,
}

impl FieldAttrs {
    pub fn parse(attrs: &[Attribute]) -> Result<Self> {
        let mut out = Self {
            rename: None,
            aliases: Vec::new(),
            skip: false,
            skip_serializing: false,
            skip_deserializing: false,
            skip_serializing_if: None,
            skip_if_default: false,
            default: DefaultAttr::None,
            flatten: false,
        };
        for attr in attrs {
            if !attr.path().is_ident(RECORD_ATTRIBUTE_NAME) {
                continue;
            }
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("rename") {
                    out.rename = Some(meta.value()?.parse::<LitStr>()?.value());
                } else if meta.path.is_ident("alias") {
                    out.aliases.push(meta.value()?.parse::<LitStr>()?.value());
                } else if meta.path.is_ident("skip") {
                    out.skip = true;
                } else if meta.path.is_ident("skip_serializing") {
                    out.skip_serializing = true;
                } else if meta.path.is_ident("skip_deserializing") {
                    out.skip_deserializing = true;
                } else if meta.path.is_ident("skip_serializing_if") {
                    let lit: LitStr = meta.value()?.parse()?;
                    out.skip_serializing_if = Some(lit.parse()?);
                } else if meta.path.is_ident("skip_if_default") {
                    out.skip_if_default = true;
                } else if meta.path.is_ident("default") {
                    out.default = if meta.input.peek(syn::Token![=]) {
                        let lit: LitStr = meta.value()?.parse()?;
                        DefaultAttr::Path(lit.parse()?)
                    } else {
                        DefaultAttr::Trait
                    };
                } else if meta.path.is_ident("flatten") {
                    out.flatten = true;
                } else {
                    return Err(meta.error("unknown record attribute"));
                }
                Ok(())
            })?;
        }
        Ok(out)
    }
}
