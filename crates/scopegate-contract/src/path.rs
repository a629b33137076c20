//! Path templates such as `/things/{id}`.

use percent_encoding::percent_decode_str;

use crate::error::{ContractError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param(String),
}

/// A parsed path template.
#[derive(Debug, Clone)]
pub struct PathTemplate {
    raw: String,
    segments: Vec<Segment>,
}

/// A successful template match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateMatch {
    /// Number of literal segments matched; higher is more specific.
    pub specificity: usize,
    /// Captured `(name, value)` path parameters, percent-decoded.
    pub params: Vec<(String, String)>,
}

impl PathTemplate {
    /// Parse a template.
    ///
    /// # Errors
    ///
    /// Returns `ContractError::InvalidPathTemplate` if the template does not
    /// start with `/` or a segment mixes literal text with a `{param}`.
    pub fn parse(raw: &str) -> Result<Self> {
        let invalid = || ContractError::InvalidPathTemplate(raw.to_string());

        let rest = raw.strip_prefix('/').ok_or_else(invalid)?;
        let segments = rest
            .split('/')
            .map(|segment| {
                if let Some(name) = segment
                    .strip_prefix('{')
                    .and_then(|s| s.strip_suffix('}'))
                {
                    if name.is_empty() || name.contains(['{', '}']) {
                        return Err(invalid());
                    }
                    Ok(Segment::Param(name.to_string()))
                } else if segment.contains(['{', '}']) {
                    Err(invalid())
                } else {
                    Ok(Segment::Literal(segment.to_string()))
                }
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            raw: raw.to_string(),
            segments,
        })
    }

    /// The template as written in the contract.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Returns `true` if both templates accept exactly the same paths.
    #[must_use]
    pub fn overlaps_exactly(&self, other: &Self) -> bool {
        self.segments.len() == other.segments.len()
            && self
                .segments
                .iter()
                .zip(&other.segments)
                .all(|pair| match pair {
                    (Segment::Literal(a), Segment::Literal(b)) => a == b,
                    (Segment::Param(_), Segment::Param(_)) => true,
                    _ => false,
                })
    }

    /// Match a request path (without query string).
    #[must_use]
    pub fn matches(&self, path: &str) -> Option<TemplateMatch> {
        let rest = path.strip_prefix('/')?;
        let parts: Vec<&str> = rest.split('/').collect();
        if parts.len() != self.segments.len() {
            return None;
        }

        let mut specificity = 0;
        let mut params = Vec::new();
        for (segment, part) in self.segments.iter().zip(parts) {
            match segment {
                Segment::Literal(literal) if literal == part => specificity += 1,
                Segment::Literal(_) => return None,
                Segment::Param(_) if part.is_empty() => return None,
                Segment::Param(name) => {
                    let value = percent_decode_str(part).decode_utf8_lossy();
                    params.push((name.clone(), value.into_owned()));
                }
            }
        }

        Some(TemplateMatch {
            specificity,
            params,
        })
    }
}
