//! LaTeX-aware text segmentation for problem statements, hints and notes.
//!
//! Content arrives from the editor as HTML with embedded TeX. The server
//! extracts the text, splits it into plain and math segments, and emits
//! escaped HTML. Typesetting itself happens in the browser: every element
//! with the `math` class is handed to KaTeX together with [`KATEX_MACROS`].
//!
//! Recognised delimiters:
//! - `\[ ... \]` and `$$ ... $$` - display math
//! - `\( ... \)` and `$ ... $` - inline math
//! - `\textbf{...}` - bold text
//! - `\text{...}` - plain text outside math mode
//!
//! An opening delimiter without a matching close is kept as plain text.

use serde_json::{Map, Value};

/// Macros shared with the client-side KaTeX renderer
pub const KATEX_MACROS: &[(&str, &str)] = &[
  ("\\RR", "\\mathbb{R}"),
  ("\\NN", "\\mathbb{N}"),
  ("\\ZZ", "\\mathbb{Z}"),
  ("\\CC", "\\mathbb{C}"),
  ("\\QQ", "\\mathbb{Q}"),
  ("\\eps", "\\varepsilon"),
  ("\\d", "\\mathrm{d}"),
  ("\\dd", "\\mathrm{d}"),
  ("\\diff", "\\frac{\\d}{\\d x}"),
  ("\\difft", "\\frac{\\d}{\\d t}"),
  ("\\lap", "\\Delta"),
  ("\\grad", "\\nabla"),
  ("\\zbar", "\\overline{z}"),
  ("\\ud", "\\,\\mathrm{d}"),
  ("\\uint", "\\int\\limits"),
  ("\\usum", "\\sum\\limits"),
  ("\\umax", "\\max\\limits"),
  ("\\umin", "\\min\\limits"),
  ("\\norm", "\\left\\|#1\\right\\|"),
  ("\\abs", "\\left|#1\\right|"),
  ("\\set", "\\left\\{#1\\right\\}"),
  ("\\seq", "\\left(#1\\right)"),
  ("\\ceil", "\\left\\lceil#1\\right\\rceil"),
  ("\\floor", "\\left\\lfloor#1\\right\\rfloor"),
  ("\\paren", "\\left(#1\\right)"),
  ("\\eval", "\\left.#1\\right|"),
  ("\\bigO", "\\mathcal{O}"),
  ("\\dv", "\\frac{\\d #1}{\\d #2}"),
  ("\\pdv", "\\frac{\\partial #1}{\\partial #2}"),
  ("\\vec", "\\mathbf{#1}"),
  ("\\mat", "\\mathbf{#1}"),
  ("\\formula", "\\displaystyle"),
];

/// Macro table as a JSON object, ready for KaTeX's `macros` option
pub fn katex_macros_json() -> Value {
  let map: Map<String, Value> = KATEX_MACROS
    .iter()
    .map(|(name, expansion)| (name.to_string(), Value::String(expansion.to_string())))
    .collect();
  Value::Object(map)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
  Plain(String),
  /// `\text{...}`
  Text(String),
  /// `\textbf{...}`
  Bold(String),
  DisplayMath(String),
  InlineMath(String),
}

/// Extract the text content of an HTML fragment.
///
/// Tags are dropped, block-level closers (`</p>`, `</div>`, `<br>`, `</li>`)
/// become line breaks, and entities are decoded. A `<` opens a tag only when
/// followed by a letter, `/`, `!` or `?`; otherwise it is text, so raw TeX
/// such as `\(a < b\)` survives.
pub fn strip_html(input: &str) -> String {
  let mut out = String::with_capacity(input.len());
  let mut rest = input;

  while let Some(start) = rest.find('<') {
    out.push_str(&rest[..start]);
    let after = &rest[start..];
    let end = after.find('>').filter(|_| opens_tag(&after[1..]));
    match end {
      Some(end) => {
        let tag = after[1..end].trim().to_ascii_lowercase();
        if is_line_break_tag(&tag) {
          out.push('\n');
        }
        rest = &after[end + 1..];
      }
      None => {
        out.push('<');
        rest = &after[1..];
      }
    }
  }
  out.push_str(rest);

  html_escape::decode_html_entities(out.trim_matches('\n')).into_owned()
}

fn opens_tag(after_lt: &str) -> bool {
  after_lt
    .chars()
    .next()
    .is_some_and(|c| c.is_ascii_alphabetic() || matches!(c, '/' | '!' | '?'))
}

fn is_line_break_tag(tag: &str) -> bool {
  let name = tag
    .trim_end_matches('/')
    .split_whitespace()
    .next()
    .unwrap_or("");
  matches!(name, "br" | "/p" | "/div" | "/li" | "/h1" | "/h2" | "/h3")
}

const TEX_COMMANDS_STARTING_WITH_N: &[&str] = &[
  "nabla", "natural", "ne", "nearrow", "neg", "neq", "newline", "nexists", "ngeq", "ngtr",
  "ni", "nleftarrow", "nleq", "nless", "nmid", "noindent", "nolimits", "nonumber", "not",
  "notin", "nparallel", "nrightarrow", "nsubseteq", "nsupseteq", "nu", "nwarrow",
];

/// Normalize line breaks in extracted text.
///
/// Literal `\n` escapes (common in LLM output) become real newlines. Unlike a
/// blanket replace, a `\n` that spells a known TeX command such as `\neq` or
/// `\nabla` is left alone so the math still typesets. Runs of blank lines
/// collapse into a single blank line.
pub fn normalize_newlines(input: &str) -> String {
  let mut unescaped = String::with_capacity(input.len());
  let mut chars = input.chars().peekable();
  while let Some(c) = chars.next() {
    if c == '\\' && chars.peek() == Some(&'n') {
      let word: String = chars
        .clone()
        .take_while(|ch| ch.is_ascii_alphabetic())
        .collect();
      if !TEX_COMMANDS_STARTING_WITH_N.contains(&word.as_str()) {
        chars.next();
        unescaped.push('\n');
        continue;
      }
    }
    unescaped.push(c);
  }

  let mut out = String::with_capacity(unescaped.len());
  let mut blank_run = false;
  for (i, line) in unescaped.split('\n').enumerate() {
    if line.trim().is_empty() {
      if i > 0 && !blank_run {
        out.push('\n');
      }
      blank_run = true;
      continue;
    }
    if i > 0 && !blank_run {
      out.push('\n');
    } else if blank_run && !out.is_empty() {
      out.push('\n');
    }
    blank_run = false;
    out.push_str(line);
  }
  out
}

/// True if the text contains anything the segmenter would treat as TeX
pub fn has_math(text: &str) -> bool {
  text.contains('$')
    || text.contains("\\[")
    || text.contains("\\]")
    || text.contains("\\(")
    || text.contains("\\text{")
}

/// Split text into plain and math segments.
pub fn segment(text: &str) -> Vec<Segment> {
  let mut segments = Vec::new();
  let mut plain = String::new();
  let mut i = 0;

  while i < text.len() {
    let rest = &text[i..];

    if let Some((seg, consumed)) = match_delimited(rest) {
      if !plain.is_empty() {
        segments.push(Segment::Plain(std::mem::take(&mut plain)));
      }
      segments.push(seg);
      i += consumed;
      continue;
    }

    // Escaped dollar sign is a literal
    if rest.starts_with("\\$") {
      plain.push('$');
      i += 2;
      continue;
    }

    let ch = rest.chars().next().unwrap_or_default();
    plain.push(ch);
    i += ch.len_utf8().max(1);
  }

  if !plain.is_empty() {
    segments.push(Segment::Plain(plain));
  }
  segments
}

/// Try to match a delimited construct at the start of `rest`.
/// Returns the segment and the number of bytes consumed.
fn match_delimited(rest: &str) -> Option<(Segment, usize)> {
  if let Some(body) = rest.strip_prefix("\\textbf{") {
    let end = brace_body_end(body)?;
    return Some((Segment::Bold(body[..end].to_string()), 8 + end + 1));
  }
  if let Some(body) = rest.strip_prefix("\\text{") {
    let end = brace_body_end(body)?;
    return Some((Segment::Text(body[..end].to_string()), 6 + end + 1));
  }
  if let Some(body) = rest.strip_prefix("\\[") {
    let end = body.find("\\]")?;
    return Some((Segment::DisplayMath(body[..end].trim().to_string()), 2 + end + 2));
  }
  if let Some(body) = rest.strip_prefix("$$") {
    let end = body.find("$$")?;
    return Some((Segment::DisplayMath(body[..end].trim().to_string()), 2 + end + 2));
  }
  if let Some(body) = rest.strip_prefix("\\(") {
    let end = body.find("\\)")?;
    return Some((Segment::InlineMath(body[..end].trim().to_string()), 2 + end + 2));
  }
  if let Some(body) = rest.strip_prefix('$') {
    let end = body.find('$')?;
    if body[..end].trim().is_empty() {
      return None;
    }
    return Some((Segment::InlineMath(body[..end].trim().to_string()), 1 + end + 1));
  }
  None
}

/// `\text{}` bodies may not contain braces; find the closing one
fn brace_body_end(body: &str) -> Option<usize> {
  let end = body.find('}')?;
  if end == 0 || body[..end].contains('{') {
    return None;
  }
  Some(end)
}

/// Render editor content to HTML ready for the browser-side KaTeX pass.
pub fn render(input: &str) -> String {
  let text = normalize_newlines(&strip_html(input));

  if !has_math(&text) {
    return format!(
      r#"<div class="latex-content whitespace-pre-line">{}</div>"#,
      html_escape::encode_text(&text)
    );
  }

  let mut html = String::from(r#"<div class="latex-content">"#);
  for seg in segment(&text) {
    match seg {
      Segment::Plain(s) => {
        if !s.trim().is_empty() {
          html.push_str(r#"<span class="whitespace-pre-line">"#);
          html.push_str(&html_escape::encode_text(&s));
          html.push_str("</span>");
        }
      }
      Segment::Text(s) => {
        html.push_str(r#"<span class="latex-text">"#);
        html.push_str(&html_escape::encode_text(&s));
        html.push_str("</span>");
      }
      Segment::Bold(s) => {
        html.push_str("<strong>");
        html.push_str(&html_escape::encode_text(&s));
        html.push_str("</strong>");
      }
      Segment::DisplayMath(tex) => {
        html.push_str(r#"<div class="math math-display">"#);
        html.push_str(&html_escape::encode_text(&tex));
        html.push_str("</div>");
      }
      Segment::InlineMath(tex) => {
        html.push_str(r#"<span class="math math-inline">"#);
        html.push_str(&html_escape::encode_text(&tex));
        html.push_str("</span>");
      }
    }
  }
  html.push_str("</div>");
  html
}
