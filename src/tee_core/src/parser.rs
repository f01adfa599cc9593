//! Command line option parser.
use std::{collections::BTreeMap, fmt, marker::PhantomData};

const HELP: &str = "help";
const VERSION: &str = "version";
const INPUT_PREFIX: &str = "--";

/// Option parsing error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParserError {
	/// The input was not expected.
	UnexpectedInput(String),
	/// The input was provided more than once.
	DuplicateInput(String),
	/// A value is required for the given token.
	MissingValue(String),
	/// An input another input depends on is missing.
	MissingInput(String),
}

impl fmt::Display for ParserError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::UnexpectedInput(i) => write!(f, "unexpected input `{i}`"),
			Self::DuplicateInput(i) => write!(f, "`{i}` given more than once"),
			Self::MissingValue(name) => write!(f, "`--{name}` needs a value"),
			Self::MissingInput(name) => write!(f, "`--{name}` is missing"),
		}
	}
}

impl std::error::Error for ParserError {}

/// Configuration for parsing one `--name` option.
#[derive(Default, Clone, Debug, PartialEq, Eq)]
pub struct Token {
	name: String,
	help: String,
	required: bool,
	requires: Option<String>,
	takes_value: bool,
	default_value: Option<String>,
}

impl Token {
	/// Create `name` token with the given `help` message.
	#[must_use]
	pub fn new(name: &str, help: &str) -> Self {
		Self { name: name.to_string(), help: help.to_string(), ..Default::default() }
	}

	/// Require that the user must provide this token.
	#[must_use]
	pub fn required(mut self, required: bool) -> Self {
		self.required = required;
		self
	}

	/// Specify another token that must be present when this one is.
	#[must_use]
	pub fn requires(mut self, other: &str) -> Self {
		self.requires = Some(other.to_string());
		self
	}

	/// Make the token take a value instead of being a flag.
	#[must_use]
	pub fn takes_value(mut self, takes_value: bool) -> Self {
		self.takes_value = takes_value;
		self
	}

	/// Value used if the user didn't provide one.
	#[must_use]
	pub fn default_value(mut self, value: &str) -> Self {
		self.default_value = Some(value.to_string());
		self
	}

	fn format_name(&self) -> String {
		if self.takes_value {
			format!("--{} <{}>", self.name, self.name)
		} else {
			format!("--{}", self.name)
		}
	}

	fn format_info(&self, width: usize) -> String {
		let mut info =
			format!("\t{:<width$}\t{}", self.format_name(), self.help);
		if let Some(v) = &self.default_value {
			info.push_str(&format!(" [default: {v}]"));
		}
		info
	}
}

/// What the user gave for a token.
#[derive(Clone, Debug, PartialEq, Eq)]
enum Given {
	Flag,
	Single(String),
}

/// Expected tokens and, once parsed, the values found for them.
#[derive(Default, Clone, Debug, PartialEq, Eq)]
pub struct Parser {
	tokens: BTreeMap<String, Token>,
	given: BTreeMap<String, Given>,
}

impl Parser {
	/// Create a new instance of [`Self`] that knows `--help` and
	/// `--version`.
	#[must_use]
	pub fn new() -> Self {
		Self::default()
			.token(Token::new(HELP, "Display a help message"))
			.token(Token::new(VERSION, "Display the version"))
	}

	/// Add an expected token.
	#[must_use]
	pub fn token(mut self, token: Token) -> Self {
		self.tokens.insert(token.name.clone(), token);
		self
	}

	/// Parse `inputs`, which must not include the binary name.
	///
	/// If `--help` or `--version` is present nothing else is checked.
	pub fn parse(&mut self, inputs: &[String]) -> Result<(), ParserError> {
		for special in [HELP, VERSION] {
			if inputs.iter().any(|i| i == &format!("{INPUT_PREFIX}{special}")) {
				self.given.insert(special.to_string(), Given::Flag);
				return Ok(());
			}
		}

		let mut iter = inputs.iter();
		while let Some(input) = iter.next() {
			let token = input
				.strip_prefix(INPUT_PREFIX)
				.and_then(|name| self.tokens.get(name))
				.ok_or_else(|| ParserError::UnexpectedInput(input.clone()))?;

			if self.given.contains_key(&token.name) {
				return Err(ParserError::DuplicateInput(input.clone()));
			}

			let given = if token.takes_value {
				let value = iter
					.next()
					.filter(|i| !i.starts_with(INPUT_PREFIX))
					.ok_or_else(|| ParserError::MissingValue(token.name.clone()))?;
				Given::Single(value.clone())
			} else {
				Given::Flag
			};

			self.given.insert(token.name.clone(), given);
		}

		self.check_constraints()
	}

	fn check_constraints(&self) -> Result<(), ParserError> {
		for token in self.tokens.values() {
			let present = self.given.contains_key(&token.name);

			if token.required && !present {
				return Err(ParserError::MissingValue(token.name.clone()));
			}
			if !present {
				continue;
			}

			if let Some(other) = &token.requires {
				if !self.given.contains_key(other) {
					return Err(ParserError::MissingInput(other.clone()));
				}
			}
		}

		Ok(())
	}

	/// Value of `name`, falling back to its default.
	#[must_use]
	pub fn single(&self, name: &str) -> Option<&String> {
		match self.given.get(name) {
			Some(Given::Single(value)) => Some(value),
			Some(Given::Flag) => None,
			None => self.tokens.get(name).and_then(|t| t.default_value.as_ref()),
		}
	}

	/// Whether the flag `name` was given. `None` if there is no such token.
	#[must_use]
	pub fn flag(&self, name: &str) -> Option<bool> {
		self.tokens
			.get(name)
			.map(|_| matches!(self.given.get(name), Some(Given::Flag)))
	}

	/// Whether `--help` was given.
	#[must_use]
	pub fn help(&self) -> bool {
		self.flag(HELP).unwrap_or(false)
	}

	/// Whether `--version` was given.
	#[must_use]
	pub fn version(&self) -> bool {
		self.flag(VERSION).unwrap_or(false)
	}

	/// Help text listing every token.
	#[must_use]
	pub fn info(&self) -> String {
		let mut info = vec![];

		let required = self.tokens_info(true);
		if !required.is_empty() {
			info.push("Required CLI inputs:".to_string());
			info.push(required);
			info.push(String::new());
		}

		let optional = self.tokens_info(false);
		if !optional.is_empty() {
			info.push("Optional CLI inputs:".to_string());
			info.push(optional);
		}

		info.join("\n")
	}

	fn tokens_info(&self, required: bool) -> String {
		let tokens: Vec<_> =
			self.tokens.values().filter(|t| t.required == required).collect();
		let width =
			tokens.iter().map(|t| t.format_name().len()).max().unwrap_or(0);

		tokens
			.into_iter()
			.map(|t| t.format_info(width))
			.collect::<Vec<_>>()
			.join("\n")
	}
}

/// Provides the [`Parser`] for a set of options.
pub trait GetParserForOptions {
	/// The parser, before any input is seen.
	fn parser() -> Parser;
}

/// Parses command line arguments with the parser from `P`.
pub struct OptionsParser<P: GetParserForOptions> {
	_phantom: PhantomData<P>,
}

impl<P: GetParserForOptions> OptionsParser<P> {
	/// Parse `args`. A leading binary name is removed from `args` first.
	pub fn parse(args: &mut Vec<String>) -> Result<Parser, ParserError> {
		if args.first().is_some_and(|a| !a.starts_with(INPUT_PREFIX)) {
			args.remove(0);
		}

		let mut parser = P::parser();
		parser.parse(args)?;
		Ok(parser)
	}
}
