//! Backbone interface hostname grammar.
//!
//! Router interfaces are commonly named like
//! `te0-0-0-1.0.chi-cr1.example.net`:
//!
//! ```text
//! hostname  := [prefix '.'] interface [subif] '.' pop '.' suffix
//! prefix    := (WORD | '-')+
//! interface := iftype ['-'] [index]
//! iftype    := "bundle" '-' "ether" | WORD
//! index     := NUMBER ('-' NUMBER){0,3}
//! subif     := '.' NUMBER
//! pop       := [site '-'] ROLE NUMBER        ROLE in {br cr sw scbr dcbr clbr var}
//! site      := WORD (WORD | NUMBER)*
//! suffix    := label ('.' label)*
//! label     := (WORD | NUMBER | '-')+
//! ```
//!
//! Matching is case-insensitive. A trailing root dot is ignored.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

const DEVICE_ROLES: &[&str] = &["br", "cr", "sw", "scbr", "dcbr", "clbr", "var"];
const MAX_INDEX_SEGMENTS: usize = 4;

/// Fields extracted from an interface hostname.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedHostname {
	pub node_id: String,
	/// Lowercased interface-type token, e.g. "te" or "bundle-ether".
	pub interface_speed_class: String,
	/// Full PoP-code label, e.g. "chi-cr1".
	pub pop_code: String,
}

/// The hostname does not follow the backbone naming grammar.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("'{name}' does not match the interface naming grammar: {reason}")]
pub struct ParseMismatch {
	pub name: String,
	pub reason: &'static str,
}

/// How a topology node id is derived from the PoP-code label.
///
/// `Prefix(n)` groups every device at one site into a single node
/// (`chi-cr1` and `chi-cr2` both become `chi`); `FullToken` keeps one
/// node per device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeIdPolicy {
	FullToken,
	Prefix(usize),
}

impl Default for NodeIdPolicy {
	fn default() -> Self {
		NodeIdPolicy::Prefix(3)
	}
}

impl NodeIdPolicy {
	pub fn node_id(&self, pop_code: &str) -> String {
		match self {
			NodeIdPolicy::FullToken => pop_code.to_string(),
			NodeIdPolicy::Prefix(n) => pop_code.chars().take(*n).collect(),
		}
	}
}

impl FromStr for NodeIdPolicy {
	type Err = String;

	/// "full", or "prefix" / "prefix:N".
	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let lower = s.trim().to_ascii_lowercase();
		match lower.split_once(':') {
			None if lower == "full" => Ok(NodeIdPolicy::FullToken),
			None if lower == "prefix" => Ok(NodeIdPolicy::default()),
			Some(("prefix", n)) => match n.parse::<usize>() {
				Ok(n) if n > 0 => Ok(NodeIdPolicy::Prefix(n)),
				_ => Err(format!("invalid prefix length '{}'", n)),
			},
			_ => Err(format!("unknown node id policy '{}' (expected full or prefix[:N])", s)),
		}
	}
}

impl fmt::Display for NodeIdPolicy {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			NodeIdPolicy::FullToken => write!(f, "full"),
			NodeIdPolicy::Prefix(n) => write!(f, "prefix:{}", n),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
	Word(String),
	Number(String),
	Dash,
	Dot,
	Other(char),
}

impl Token {
	fn text(&self) -> String {
		match self {
			Token::Word(s) | Token::Number(s) => s.clone(),
			Token::Dash => "-".to_string(),
			Token::Dot => ".".to_string(),
			Token::Other(c) => c.to_string(),
		}
	}
}

/// Split a lowercased hostname into runs of letters, runs of digits,
/// and single punctuation characters.
fn tokenize(input: &str) -> Vec<Token> {
	let mut tokens = Vec::new();
	let mut chars = input.chars().peekable();
	while let Some(&c) = chars.peek() {
		if c.is_ascii_alphabetic() {
			let mut word = String::new();
			while let Some(&c) = chars.peek().filter(|c| c.is_ascii_alphabetic()) {
				word.push(c.to_ascii_lowercase());
				chars.next();
			}
			tokens.push(Token::Word(word));
		} else if c.is_ascii_digit() {
			let mut num = String::new();
			while let Some(&c) = chars.peek().filter(|c| c.is_ascii_digit()) {
				num.push(c);
				chars.next();
			}
			tokens.push(Token::Number(num));
		} else {
			tokens.push(match c {
				'-' => Token::Dash,
				'.' => Token::Dot,
				other => Token::Other(other),
			});
			chars.next();
		}
	}
	tokens
}

/// Recursive-descent parser over a token slice.
struct Parser<'a> {
	tokens: &'a [Token],
	pos: usize,
}

type Rule<T> = Result<T, &'static str>;

impl<'a> Parser<'a> {
	fn new(tokens: &'a [Token], pos: usize) -> Self {
		Self { tokens, pos }
	}

	fn peek(&self) -> Option<&'a Token> {
		self.tokens.get(self.pos)
	}

	fn peek_at(&self, offset: usize) -> Option<&'a Token> {
		self.tokens.get(self.pos + offset)
	}

	fn bump(&mut self) -> Option<&'a Token> {
		let tok = self.tokens.get(self.pos);
		if tok.is_some() {
			self.pos += 1;
		}
		tok
	}

	fn eat(&mut self, expected: &Token) -> bool {
		if self.peek() == Some(expected) {
			self.pos += 1;
			true
		} else {
			false
		}
	}

	fn expect_dot(&mut self, reason: &'static str) -> Rule<()> {
		if self.eat(&Token::Dot) { Ok(()) } else { Err(reason) }
	}

	fn at_label_end(&self) -> bool {
		matches!(self.peek(), None | Some(Token::Dot))
	}

	/// prefix := (WORD | '-')+ '.'
	fn prefix(&mut self) -> Rule<()> {
		let start = self.pos;
		while matches!(self.peek(), Some(Token::Word(_)) | Some(Token::Dash)) {
			self.pos += 1;
		}
		if self.pos == start {
			return Err("empty domain prefix");
		}
		self.expect_dot("domain prefix not followed by a dot")
	}

	/// interface := iftype ['-'] [index]
	fn interface(&mut self) -> Rule<String> {
		let iftype = self.iftype()?;
		let dashed = self.eat(&Token::Dash);
		if matches!(self.peek(), Some(Token::Number(_))) {
			self.index()?;
		} else if dashed {
			return Err("dash after interface type without an index");
		}
		if !self.at_label_end() {
			return Err("unexpected characters in interface label");
		}
		Ok(iftype)
	}

	/// iftype := "bundle" '-' "ether" | WORD
	fn iftype(&mut self) -> Rule<String> {
		let bundle = Token::Word("bundle".to_string());
		let ether = Token::Word("ether".to_string());
		if self.peek() == Some(&bundle)
			&& self.peek_at(1) == Some(&Token::Dash)
			&& self.peek_at(2) == Some(&ether)
		{
			self.pos += 3;
			return Ok("bundle-ether".to_string());
		}
		match self.bump() {
			Some(Token::Word(w)) => Ok(w.clone()),
			_ => Err("interface label does not start with a type"),
		}
	}

	/// index := NUMBER ('-' NUMBER){0,3}
	fn index(&mut self) -> Rule<()> {
		let mut segments = 0;
		loop {
			match self.bump() {
				Some(Token::Number(_)) => segments += 1,
				_ => return Err("interface index segment is not numeric"),
			}
			if segments > MAX_INDEX_SEGMENTS {
				return Err("interface index has too many segments");
			}
			if !self.eat(&Token::Dash) {
				return Ok(());
			}
		}
	}

	/// subif := '.' NUMBER, followed by the end of the label
	fn subinterface(&mut self) {
		if self.peek() == Some(&Token::Dot)
			&& matches!(self.peek_at(1), Some(Token::Number(_)))
			&& matches!(self.peek_at(2), None | Some(Token::Dot))
		{
			self.pos += 2;
		}
	}

	/// pop := [site '-'] ROLE NUMBER, returning the label text
	fn pop(&mut self) -> Rule<String> {
		let start = self.pos;
		let mut label = Vec::new();
		while let Some(tok) = self.peek().filter(|t| **t != Token::Dot) {
			label.push(tok);
			self.pos += 1;
		}
		let role_at = match label.as_slice() {
			[Token::Word(_), Token::Number(_)] => 0,
			[Token::Word(_), .., Token::Dash, Token::Word(_), Token::Number(_)] => label.len() - 2,
			_ => return Err("PoP label is not [site-]role<digits>"),
		};
		let Token::Word(role) = label[role_at] else {
			return Err("PoP label has no device role");
		};
		if !DEVICE_ROLES.contains(&role.as_str()) {
			return Err("PoP label has an unknown device role");
		}
		if role_at > 0 {
			let site = &label[..role_at - 1];
			let site_ok = site.iter()
				.all(|t| matches!(t, Token::Word(_) | Token::Number(_)));
			if !site_ok {
				return Err("PoP site code is not alphanumeric");
			}
		}
		Ok(self.tokens[start..self.pos].iter().map(Token::text).collect())
	}

	/// suffix := label ('.' label)* EOF
	fn suffix(&mut self) -> Rule<()> {
		loop {
			let start = self.pos;
			while matches!(
				self.peek(),
				Some(Token::Word(_)) | Some(Token::Number(_)) | Some(Token::Dash)
			) {
				self.pos += 1;
			}
			if self.pos == start {
				return Err("empty domain suffix label");
			}
			match self.bump() {
				None => return Ok(()),
				Some(Token::Dot) => continue,
				Some(_) => return Err("invalid character in domain suffix"),
			}
		}
	}

	/// interface [subif] '.' pop '.' suffix
	fn interface_hostname(&mut self) -> Rule<(String, String)> {
		let iftype = self.interface()?;
		self.subinterface();
		self.expect_dot("interface label not followed by a dot")?;
		let pop = self.pop()?;
		self.expect_dot("PoP label not followed by a domain")?;
		self.suffix()?;
		Ok((iftype, pop))
	}
}

/// Parse an interface hostname with the given node id policy.
pub fn parse(name: &str, policy: NodeIdPolicy) -> Result<ParsedHostname, ParseMismatch> {
	let trimmed = name.trim().trim_end_matches('.');
	let tokens = tokenize(trimmed);

	// Try without a domain prefix first, then with one
	let direct = Parser::new(&tokens, 0).interface_hostname();
	let result = direct.or_else(|first_err| {
		let mut p = Parser::new(&tokens, 0);
		p.prefix()
			.and_then(|_| p.interface_hostname())
			.map_err(|_| first_err)
	});

	match result {
		Ok((iftype, pop_code)) => Ok(ParsedHostname {
			node_id: policy.node_id(&pop_code),
			interface_speed_class: iftype,
			pop_code,
		}),
		Err(reason) => Err(ParseMismatch { name: name.to_string(), reason }),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn p(name: &str) -> Result<ParsedHostname, ParseMismatch> {
		parse(name, NodeIdPolicy::default())
	}

	#[test]
	fn test_full_interface_name() {
		let h = p("te0-0-0-1.0.chi-cr1.example.net").unwrap();
		assert_eq!(h.interface_speed_class, "te");
		assert_eq!(h.pop_code, "chi-cr1");
		assert_eq!(h.node_id, "chi");
	}

	#[test]
	fn test_full_token_policy() {
		let h = parse("te0-0-0-1.0.chi-cr1.example.net", NodeIdPolicy::FullToken).unwrap();
		assert_eq!(h.node_id, "chi-cr1");
	}

	#[test]
	fn test_non_backbone_host_is_no_match() {
		assert!(p("mail.example.com").is_err());
		assert!(p("unrelated.host").is_err());
		assert!(p("").is_err());
		assert!(p("63-216-0-1.static.example.net").is_err());
	}

	#[test]
	fn test_case_insensitive_and_trailing_dot() {
		let h = p("TenGE0-1.NYC-CR2.Example.NET.").unwrap();
		assert_eq!(h.interface_speed_class, "tenge");
		assert_eq!(h.node_id, "nyc");
	}

	#[test]
	fn test_bundle_ether() {
		let h = p("bundle-ether12.lax-br3.example.net").unwrap();
		assert_eq!(h.interface_speed_class, "bundle-ether");
		assert_eq!(h.pop_code, "lax-br3");
	}

	#[test]
	fn test_domain_prefix_label() {
		let h = p("customer-link.gi1-2.ams-sw4.example.net").unwrap();
		assert_eq!(h.interface_speed_class, "gi");
		assert_eq!(h.node_id, "ams");
	}

	#[test]
	fn test_bare_role_pop_code() {
		let h = parse("hu0-1-0-0.cr12.example.net", NodeIdPolicy::FullToken).unwrap();
		assert_eq!(h.pop_code, "cr12");
		assert_eq!(h.interface_speed_class, "hu");
	}

	#[test]
	fn test_index_optional() {
		let h = p("pos.dal-dcbr1.example.net").unwrap();
		assert_eq!(h.interface_speed_class, "pos");
	}

	#[test]
	fn test_too_many_index_segments() {
		assert!(p("te0-0-0-0-1.chi-cr1.example.net").is_err());
	}

	#[test]
	fn test_unknown_role_rejected() {
		let err = p("te0.chi-xx1.example.net").unwrap_err();
		assert_eq!(err.reason, "PoP label has an unknown device role");
	}

	#[test]
	fn test_site_form_requires_known_role() {
		assert!(p("host1.dsl-pool1.example.net").is_err());
		assert!(p("host2.cable-pool2.example.net").is_err());
		assert!(p("te0.chi-core1.example.net").is_err());
		assert_eq!(p("te0.chi-scbr1.example.net").unwrap().pop_code, "chi-scbr1");
	}

	#[test]
	fn test_missing_suffix_rejected() {
		assert!(p("te0.chi-cr1").is_err());
		assert!(p("te0.chi-cr1.").is_err());
	}

	#[test]
	fn test_garbage_characters_rejected() {
		assert!(p("te0.chi-cr1.exa_mple.net").is_err());
		assert!(p("te0!.chi-cr1.example.net").is_err());
	}

	#[test]
	fn test_policy_from_str() {
		assert_eq!("full".parse::<NodeIdPolicy>().unwrap(), NodeIdPolicy::FullToken);
		assert_eq!("prefix".parse::<NodeIdPolicy>().unwrap(), NodeIdPolicy::Prefix(3));
		assert_eq!("prefix:4".parse::<NodeIdPolicy>().unwrap(), NodeIdPolicy::Prefix(4));
		assert!("prefix:0".parse::<NodeIdPolicy>().is_err());
		assert!("fuzzy".parse::<NodeIdPolicy>().is_err());
		assert_eq!(NodeIdPolicy::Prefix(4).to_string(), "prefix:4");
	}
}
