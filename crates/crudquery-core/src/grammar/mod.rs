//! Parsing of the textual filter grammar.
//!
//! The serializer is the producer of this grammar; the parser exists so that
//! query text can be round-tripped back into a [`FilterDescriptor`] and so
//! that filters can be typed by hand at the command line.
//!
//! # Example
//!
//! ```
//! use crudquery_core::{parse_filter, FilterDescriptor, Operator};
//!
//! let filter = parse_filter(r#"Region != null && Region.Nombre == "Norte""#).unwrap();
//! assert_eq!(
//!     filter,
//!     FilterDescriptor::and(vec![
//!         FilterDescriptor::check("Region", Operator::IsNotNull),
//!         FilterDescriptor::leaf("Region.Nombre", Operator::Equals, "Norte"),
//!     ])
//! );
//! ```

mod lexer;
mod parser;

#[cfg(test)]
mod tests;

pub use lexer::{Lexer, PositionedToken, Token};
pub use parser::QueryParser;

use crate::descriptor::FilterDescriptor;
use crate::error::Result;
use crate::lower::{lower_folded, LoweredFilter};

/// Parses query text and lowers it to a filter tree.
///
/// Text compared through `member.ToLower()` parses to the plain member; use
/// [`parse_query`] to learn whether the text folded case.
pub fn parse_filter(input: &str) -> Result<FilterDescriptor> {
    Ok(parse_query(input)?.filter)
}

/// Parses query text into a filter tree and the case mode it was written in.
///
/// ```
/// use crudquery_core::{parse_query, CaseSensitivity};
///
/// let parsed = parse_query(r#"Nombre.ToLower().StartsWith("mar")"#).unwrap();
/// assert_eq!(parsed.case_sensitivity, Some(CaseSensitivity::CaseInsensitive));
/// ```
pub fn parse_query(input: &str) -> Result<LoweredFilter> {
    let expr = QueryParser::parse(input)?;
    Ok(lower_folded(&expr)?)
}
