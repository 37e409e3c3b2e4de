//! Instructions sent to a render surface.

/// One surface operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptOp {
    /// Replace the whole content container with this markup.
    Replace(String),
    /// Append this markup to the content container.
    Append(String),
    ScrollToBottom,
}

/// An ordered batch of surface operations applied in one call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Script {
    ops: Vec<ScriptOp>,
}

impl Script {
    pub const fn new() -> Self {
        Self { ops: Vec::new() }
    }

    /// A script that only scrolls.
    pub fn scroll_to_bottom() -> Self {
        Self {
            ops: vec![ScriptOp::ScrollToBottom],
        }
    }

    pub fn push(&mut self, op: ScriptOp) {
        self.ops.push(op);
    }

    pub fn ops(&self) -> &[ScriptOp] {
        &self.ops
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Markup carried by the content operations, concatenated.
    pub fn markup(&self) -> String {
        self.ops
            .iter()
            .filter_map(|op| match op {
                ScriptOp::Replace(html) | ScriptOp::Append(html) => Some(html.as_str()),
                ScriptOp::ScrollToBottom => None,
            })
            .collect()
    }

    /// JavaScript calling the helpers defined by
    /// [`crate::style::markup::bootstrap_page`].
    pub fn to_javascript(&self) -> String {
        let mut js = String::new();
        for op in &self.ops {
            match op {
                ScriptOp::Replace(html) => {
                    js.push_str("tailmark.replace(");
                    js.push_str(&js_string(html));
                    js.push_str(");");
                }
                ScriptOp::Append(html) => {
                    js.push_str("tailmark.append(");
                    js.push_str(&js_string(html));
                    js.push_str(");");
                }
                ScriptOp::ScrollToBottom => js.push_str("tailmark.scrollToBottom();"),
            }
        }
        js
    }
}

/// Quote `s` as a JavaScript string literal.
///
/// JSON string syntax is valid JavaScript except for the two Unicode line
/// separators, which JSON leaves raw.
fn js_string(s: &str) -> String {
    serde_json::Value::from(s)
        .to_string()
        .replace('\u{2028}', "\\u2028")
        .replace('\u{2029}', "\\u2029")
}
