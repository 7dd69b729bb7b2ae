//! Streaming markup tokenizer.
//!
//! Turns a template string into a flat stream of open-tag, close-tag and
//! text tokens. Comments are skipped, the five standard entities are
//! decoded, attribute name case is preserved (directive attributes such as
//! `@bind:innerHTML` depend on it), and void tags report themselves as
//! self-closing. Tree building and invariant checks live in `parse.rs`.

use crate::error::{Result, WeftError, ERR_PARSE_MALFORMED};
use crate::html::is_void_tag;

#[derive(Debug, Clone, PartialEq)]
pub enum MarkupToken {
    OpenTag {
        name: String,
        attributes: Vec<(String, String)>,
        self_closing: bool,
    },
    CloseTag {
        name: String,
    },
    Text(String),
}

pub fn tokenize(source: &str) -> Result<Vec<MarkupToken>> {
    Lexer {
        chars: source.chars().collect(),
        pos: 0,
    }
    .run()
}

struct Lexer {
    chars: Vec<char>,
    pos: usize,
}

impl Lexer {
    fn run(mut self) -> Result<Vec<MarkupToken>> {
        let mut tokens = Vec::new();

        while self.pos < self.chars.len() {
            if self.peek() == Some('<') {
                if self.starts_with("<!--") {
                    self.skip_comment()?;
                } else if self.starts_with("<!") {
                    // doctype or other declaration, irrelevant to templates
                    self.skip_until('>')?;
                } else if self.starts_with("</") {
                    tokens.push(self.read_close_tag()?);
                } else {
                    tokens.push(self.read_open_tag()?);
                }
            } else {
                let text = self.read_text();
                if !text.is_empty() {
                    tokens.push(MarkupToken::Text(text));
                }
            }
        }

        Ok(tokens)
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn starts_with(&self, prefix: &str) -> bool {
        self.chars[self.pos..]
            .iter()
            .zip(prefix.chars())
            .filter(|(a, b)| **a == *b)
            .count()
            == prefix.chars().count()
    }

    fn error(&self, message: impl Into<String>) -> WeftError {
        WeftError::new(ERR_PARSE_MALFORMED, message)
    }

    fn skip_comment(&mut self) -> Result<()> {
        self.pos += 4; // <!--
        while self.pos < self.chars.len() {
            if self.starts_with("-->") {
                self.pos += 3;
                return Ok(());
            }
            self.pos += 1;
        }
        Err(self.error("Unterminated comment"))
    }

    fn skip_until(&mut self, end: char) -> Result<()> {
        while let Some(c) = self.peek() {
            self.pos += 1;
            if c == end {
                return Ok(());
            }
        }
        Err(self.error("Unterminated markup declaration"))
    }

    fn read_text(&mut self) -> String {
        let mut text = String::new();
        while let Some(c) = self.peek() {
            if c == '<' {
                break;
            }
            if c == '&' {
                text.push_str(&self.read_entity());
            } else {
                text.push(c);
                self.pos += 1;
            }
        }
        text
    }

    fn read_entity(&mut self) -> String {
        // Decode the common named entities, pass anything else through
        const ENTITIES: [(&str, char); 5] = [
            ("&amp;", '&'),
            ("&lt;", '<'),
            ("&gt;", '>'),
            ("&quot;", '"'),
            ("&#39;", '\''),
        ];
        for (entity, decoded) in ENTITIES {
            if self.starts_with(entity) {
                self.pos += entity.len();
                return decoded.to_string();
            }
        }
        self.pos += 1;
        "&".to_string()
    }

    fn read_close_tag(&mut self) -> Result<MarkupToken> {
        self.pos += 2; // </
        let name = self.read_name();
        if name.is_empty() {
            return Err(self.error("Close tag with no name"));
        }
        self.skip_whitespace();
        match self.peek() {
            Some('>') => {
                self.pos += 1;
                Ok(MarkupToken::CloseTag { name })
            }
            _ => Err(self.error(format!("Malformed close tag </{}", name))),
        }
    }

    fn read_open_tag(&mut self) -> Result<MarkupToken> {
        self.pos += 1; // <
        let name = self.read_name();
        if name.is_empty() {
            return Err(self.error("Open tag with no name"));
        }

        let mut attributes = Vec::new();
        loop {
            self.skip_whitespace();
            match self.peek() {
                Some('>') => {
                    self.pos += 1;
                    let self_closing = is_void_tag(&name.to_ascii_lowercase());
                    return Ok(MarkupToken::OpenTag {
                        name,
                        attributes,
                        self_closing,
                    });
                }
                Some('/') => {
                    self.pos += 1;
                    self.skip_whitespace();
                    if self.peek() == Some('>') {
                        self.pos += 1;
                        return Ok(MarkupToken::OpenTag {
                            name,
                            attributes,
                            self_closing: true,
                        });
                    }
                    return Err(self.error(format!("Stray `/` in tag <{}>", name)));
                }
                Some(_) => {
                    attributes.push(self.read_attribute(&name)?);
                }
                None => return Err(self.error(format!("Unterminated tag <{}>", name))),
            }
        }
    }

    fn read_attribute(&mut self, tag: &str) -> Result<(String, String)> {
        let name = self.read_attr_name();
        if name.is_empty() {
            return Err(self.error(format!(
                "Unexpected character `{}` in tag <{}>",
                self.peek().unwrap_or(' '),
                tag
            )));
        }
        self.skip_whitespace();
        if self.peek() != Some('=') {
            // bare attribute: <input disabled>
            return Ok((name, String::new()));
        }
        self.pos += 1;
        self.skip_whitespace();

        let value = match self.peek() {
            Some(quote @ ('"' | '\'')) => {
                self.pos += 1;
                let mut value = String::new();
                loop {
                    match self.peek() {
                        Some(c) if c == quote => {
                            self.pos += 1;
                            break;
                        }
                        Some('&') => value.push_str(&self.read_entity()),
                        Some(c) => {
                            value.push(c);
                            self.pos += 1;
                        }
                        None => {
                            return Err(self.error(format!(
                                "Unterminated value for attribute `{}` in <{}>",
                                name, tag
                            )))
                        }
                    }
                }
                value
            }
            Some(_) => {
                let mut value = String::new();
                while let Some(c) = self.peek() {
                    if c.is_whitespace() || c == '>' || c == '/' {
                        break;
                    }
                    value.push(c);
                    self.pos += 1;
                }
                value
            }
            None => {
                return Err(self.error(format!(
                    "Unterminated value for attribute `{}` in <{}>",
                    name, tag
                )))
            }
        };

        Ok((name, value))
    }

    fn read_name(&mut self) -> String {
        let mut name = String::new();
        while let Some(c) = self.peek() {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                name.push(c);
                self.pos += 1;
            } else {
                break;
            }
        }
        name
    }

    fn read_attr_name(&mut self) -> String {
        // attribute names additionally allow the directive syntax: @for:item
        let mut name = String::new();
        while let Some(c) = self.peek() {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '@' | ':' | '.') {
                name.push(c);
                self.pos += 1;
            } else {
                break;
            }
        }
        name
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.pos += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_element() {
        let tokens = tokenize("<div class=\"app\">hi</div>").unwrap();
        assert_eq!(
            tokens,
            vec![
                MarkupToken::OpenTag {
                    name: "div".to_string(),
                    attributes: vec![("class".to_string(), "app".to_string())],
                    self_closing: false,
                },
                MarkupToken::Text("hi".to_string()),
                MarkupToken::CloseTag {
                    name: "div".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_directive_attribute_names() {
        let tokens = tokenize("<li @for:item=\"todos\" @bind:class=\"c\"></li>").unwrap();
        match &tokens[0] {
            MarkupToken::OpenTag { attributes, .. } => {
                assert_eq!(attributes[0].0, "@for:item");
                assert_eq!(attributes[1].0, "@bind:class");
            }
            other => panic!("unexpected token: {:?}", other),
        }
    }

    #[test]
    fn test_void_and_self_closing() {
        let tokens = tokenize("<input type=\"text\"><todo-item />").unwrap();
        assert!(matches!(
            &tokens[0],
            MarkupToken::OpenTag { self_closing: true, .. }
        ));
        assert!(matches!(
            &tokens[1],
            MarkupToken::OpenTag { name, self_closing: true, .. } if name == "todo-item"
        ));
    }

    #[test]
    fn test_comment_and_entities() {
        let tokens = tokenize("<p><!-- note -->a &amp; b</p>").unwrap();
        assert_eq!(tokens[1], MarkupToken::Text("a & b".to_string()));
    }

    #[test]
    fn test_bare_attribute() {
        let tokens = tokenize("<input disabled>").unwrap();
        match &tokens[0] {
            MarkupToken::OpenTag { attributes, .. } => {
                assert_eq!(attributes[0], ("disabled".to_string(), String::new()));
            }
            other => panic!("unexpected token: {:?}", other),
        }
    }

    #[test]
    fn test_malformed_markup() {
        assert!(tokenize("<div").is_err());
        assert!(tokenize("<p><!-- open").is_err());
        assert_eq!(
            tokenize("<div =oops></div>").unwrap_err().code,
            ERR_PARSE_MALFORMED
        );
    }
}
