//! Inlines the template's script and stylesheets so the report is self-contained.
//!
//! The first `script` element gets the text of the asset named by its
//! `src`, and every stylesheet `link` inside `head` becomes a `style`
//! element holding the linked asset. The input document is left untouched;
//! a rewritten copy is returned.

use crate::assets::AssetSource;
use crate::error::{Result, TrxerError};
use crate::markup::{Attribute, Document, Element, Node};
use tracing::{debug, info};

const TEMPLATE_OPEN: &str = "{[";
const TEMPLATE_OPEN_ESCAPED: &str = "{[{]}";

/// Rewrite `document` with its script and stylesheets inlined from `assets`
pub fn inline_assets(document: &Document, assets: &dyn AssetSource) -> Result<Document> {
    let mut rewriter = Rewriter {
        assets,
        script_inlined: false,
        head_seen: false,
    };
    let root = rewriter.element(&document.root, false)?;

    if !rewriter.head_seen {
        return Err(TrxerError::ResourceNotFound {
            name: "head element".to_string(),
        });
    }
    if !rewriter.script_inlined {
        return Err(TrxerError::ResourceNotFound {
            name: "script element".to_string(),
        });
    }

    Ok(Document {
        prolog: document.prolog.clone(),
        root,
        epilog: document.epilog.clone(),
    })
}

struct Rewriter<'a> {
    assets: &'a dyn AssetSource,
    script_inlined: bool,
    head_seen: bool,
}

impl Rewriter<'_> {
    fn element(&mut self, element: &Element, in_head: bool) -> Result<Element> {
        let in_head = in_head || element.is("head");
        self.head_seen |= in_head;

        let mut children = Vec::with_capacity(element.children.len());
        for child in &element.children {
            children.push(match child {
                Node::Element(e) if !self.script_inlined && e.is("script") => {
                    self.script_inlined = true;
                    Node::Element(self.inline_script(e)?)
                }
                Node::Element(e) if in_head && is_stylesheet_link(e) => {
                    Node::Element(self.inline_stylesheet(e)?)
                }
                Node::Element(e) => Node::Element(self.element(e, in_head)?),
                other => other.clone(),
            });
        }

        Ok(Element {
            name: element.name.clone(),
            attributes: element.attributes.clone(),
            children,
        })
    }

    fn inline_script(&self, script: &Element) -> Result<Element> {
        let src = script.attr("src").ok_or_else(|| TrxerError::ResourceNotFound {
            name: "script@src".to_string(),
        })?;
        info!("Loading javascript...");
        let text = self.assets.require(src)?;
        debug!(asset = src, bytes = text.len(), "inlined script");

        Ok(Element {
            name: script.name.clone(),
            attributes: script
                .attributes
                .iter()
                .filter(|a| !a.name.eq_ignore_ascii_case("src"))
                .cloned()
                .collect(),
            children: vec![Node::Raw(escape_template_open(text))],
        })
    }

    fn inline_stylesheet(&self, link: &Element) -> Result<Element> {
        let href = link.attr("href").ok_or_else(|| TrxerError::ResourceNotFound {
            name: "link@href".to_string(),
        })?;
        info!("Loading css...");
        let text = self.assets.require(href)?;
        debug!(asset = href, bytes = text.len(), "inlined stylesheet");

        let mut style = Element::new("style");
        if let Some(media) = link.attr("media") {
            style.attributes.push(Attribute {
                name: "media".to_string(),
                value: media.to_string(),
            });
        }
        style.children.push(Node::Raw(escape_template_open(text)));
        Ok(style)
    }
}

/// A `link` with `rel` containing `stylesheet`, or with no `rel` at all
fn is_stylesheet_link(element: &Element) -> bool {
    element.is("link")
        && element.attr("rel").map_or(true, |rel| {
            rel.split_ascii_whitespace()
                .any(|token| token.eq_ignore_ascii_case("stylesheet"))
        })
}

/// Keep inlined text literal when the result is compiled as a template
fn escape_template_open(text: &str) -> String {
    text.replace(TEMPLATE_OPEN, TEMPLATE_OPEN_ESCAPED)
}
