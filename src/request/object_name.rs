//! JMX object names
//!
//! An [`ObjectName`] is a domain plus an ordered list of key properties,
//! e.g. `java.lang:type=GarbageCollector,name=G1 Young Generation`.
//! Parsing validates the full JMX grammar including quoted values, and the
//! name can be rendered either in *canonical* form (keys sorted) or in
//! *initial* form (keys in the order they were written).

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{RequestError, RequestResult};

/// Parsed JMX object name
///
/// Values are stored exactly as written, quotes and escapes included, so
/// both string forms reproduce the author's quoting. Equality is logical:
/// `a:k="v"` and `a:k=v` are equal names with different string forms.
#[derive(Debug, Clone)]
pub struct ObjectName {
    domain: String,
    properties: Vec<(String, String)>,
    property_list_pattern: bool,
}

impl ObjectName {
    /// Parse an object name
    ///
    /// # Errors
    /// Returns [`RequestError::MalformedName`] when `name` violates the
    /// object name grammar. The empty string is rejected.
    pub fn parse(name: &str) -> RequestResult<Self> {
        if name.is_empty() {
            return Err(RequestError::malformed_name(name, "name is empty"));
        }

        let (domain, list) = name
            .split_once(':')
            .ok_or_else(|| RequestError::malformed_name(name, "missing ':' after the domain"))?;

        validate_domain(name, domain)?;

        if list.is_empty() {
            return Err(RequestError::malformed_name(
                name,
                "key property list is empty",
            ));
        }

        let (properties, property_list_pattern) = parse_property_list(name, list)?;

        Ok(Self {
            domain: domain.to_string(),
            properties,
            property_list_pattern,
        })
    }

    /// Parse an optional object name
    ///
    /// # Errors
    /// [`RequestError::MissingName`] for `None`, otherwise as [`ObjectName::parse`].
    pub fn from_optional(name: Option<&str>) -> RequestResult<Self> {
        match name {
            Some(name) => Self::parse(name),
            None => Err(RequestError::MissingName),
        }
    }

    /// Domain part (may be empty)
    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Key properties in insertion order, values as written
    pub fn properties(&self) -> impl Iterator<Item = (&str, &str)> {
        self.properties
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of key properties
    pub fn len(&self) -> usize {
        self.properties.len()
    }

    /// True when the name has no key properties (only possible for `domain:*`)
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    /// Raw value of a key property, quotes included
    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Logical (unquoted) value of a key property
    pub fn property_value(&self, key: &str) -> Option<Cow<'_, str>> {
        self.property(key).map(unquote)
    }

    /// Canonical form: properties sorted by key
    pub fn canonical(&self) -> String {
        let mut sorted: Vec<&(String, String)> = self.properties.iter().collect();
        sorted.sort_by(|a, b| a.0.cmp(&b.0));
        self.render(sorted.into_iter())
    }

    /// Initial form: properties in the order they were written
    pub fn initial(&self) -> String {
        self.render(self.properties.iter())
    }

    fn render<'a>(&self, properties: impl Iterator<Item = &'a (String, String)>) -> String {
        let mut out = String::with_capacity(self.domain.len() + 1 + self.properties.len() * 16);
        out.push_str(&self.domain);
        out.push(':');

        let mut first = true;
        for (key, value) in properties {
            if !first {
                out.push(',');
            }
            first = false;
            out.push_str(key);
            out.push('=');
            out.push_str(value);
        }

        if self.property_list_pattern {
            if !first {
                out.push(',');
            }
            out.push('*');
        }
        out
    }

    /// True when this name is a pattern
    pub fn is_pattern(&self) -> bool {
        self.is_domain_pattern() || self.is_property_pattern()
    }

    /// True when the domain contains `*` or `?`
    pub fn is_domain_pattern(&self) -> bool {
        self.domain.contains(['*', '?'])
    }

    /// True when the property list ends with `,*` or a value is a pattern
    pub fn is_property_pattern(&self) -> bool {
        self.property_list_pattern || self.is_property_value_pattern()
    }

    /// True when the property list carries the `*` wildcard
    pub fn is_property_list_pattern(&self) -> bool {
        self.property_list_pattern
    }

    /// True when any value contains an unescaped `*` or `?`
    pub fn is_property_value_pattern(&self) -> bool {
        self.properties.iter().any(|(_, v)| value_has_wildcard(v))
    }

    /// Quote a value following the JMX quoting rules
    pub fn quote(value: &str) -> String {
        let mut out = String::with_capacity(value.len() + 2);
        out.push('"');
        for c in value.chars() {
            match c {
                '\\' | '"' | '*' | '?' => {
                    out.push('\\');
                    out.push(c);
                }
                '\n' => out.push_str("\\n"),
                _ => out.push(c),
            }
        }
        out.push('"');
        out
    }

    /// Reverse [`ObjectName::quote`]; unquoted input is returned unchanged
    pub fn unquote(value: &str) -> Cow<'_, str> {
        unquote(value)
    }
}

fn validate_domain(name: &str, domain: &str) -> RequestResult<()> {
    for c in domain.chars() {
        match c {
            '\n' => return Err(RequestError::malformed_name(name, "domain contains a newline")),
            ',' | '=' | '"' => {
                return Err(RequestError::malformed_name(
                    name,
                    format!("domain contains illegal character '{}'", c),
                ))
            }
            _ => {}
        }
    }
    Ok(())
}

fn validate_key(name: &str, key: &str) -> RequestResult<()> {
    if key.is_empty() {
        return Err(RequestError::malformed_name(name, "empty key"));
    }
    if let Some(c) = key.chars().find(|c| matches!(c, ':' | '*' | '?' | '"' | '\n')) {
        return Err(RequestError::malformed_name(
            name,
            format!("key '{}' contains illegal character '{}'", key.escape_debug(), c.escape_debug()),
        ));
    }
    Ok(())
}

/// Parse `k=v,k2="v2",*` into properties plus the list-wildcard flag
fn parse_property_list(name: &str, list: &str) -> RequestResult<(Vec<(String, String)>, bool)> {
    let mut properties: Vec<(String, String)> = Vec::new();
    let mut wildcard = false;
    let mut pos = 0;

    loop {
        let rest = &list[pos..];

        if rest == "*" || rest.starts_with("*,") {
            if wildcard {
                return Err(RequestError::malformed_name(
                    name,
                    "wildcard '*' given more than once",
                ));
            }
            wildcard = true;
            pos += 1;
        } else {
            let key_end = match rest.find(['=', ',']) {
                Some(i) if rest.as_bytes()[i] == b'=' => i,
                Some(i) => {
                    return Err(RequestError::malformed_name(
                        name,
                        format!("property '{}' has no value", &rest[..i]),
                    ))
                }
                None => {
                    return Err(RequestError::malformed_name(
                        name,
                        format!("property '{}' has no value", rest),
                    ))
                }
            };

            let key = &rest[..key_end];
            validate_key(name, key)?;
            if properties.iter().any(|(k, _)| k == key) {
                return Err(RequestError::malformed_name(
                    name,
                    format!("duplicate key '{}'", key),
                ));
            }

            let value_start = pos + key_end + 1;
            let value_rest = &list[value_start..];
            let value_len = if value_rest.starts_with('"') {
                scan_quoted(name, value_rest)?
            } else {
                scan_unquoted(name, key, value_rest)?
            };

            properties.push((key.to_string(), value_rest[..value_len].to_string()));
            pos = value_start + value_len;
        }

        if pos == list.len() {
            break;
        }
        // scan_quoted/scan_unquoted stop at a ',' or at the end
        pos += 1;
        if pos == list.len() {
            return Err(RequestError::malformed_name(
                name,
                "trailing ',' in key property list",
            ));
        }
    }

    Ok((properties, wildcard))
}

/// Length of an unquoted value at the start of `rest`
fn scan_unquoted(name: &str, key: &str, rest: &str) -> RequestResult<usize> {
    let end = rest.find(',').unwrap_or(rest.len());
    let value = &rest[..end];

    if value.is_empty() {
        return Err(RequestError::malformed_name(
            name,
            format!("empty value for key '{}'", key),
        ));
    }
    if let Some(c) = value.chars().find(|c| matches!(c, '=' | ':' | '"' | '\n')) {
        return Err(RequestError::malformed_name(
            name,
            format!(
                "value of key '{}' contains '{}' and must be quoted",
                key,
                c.escape_debug()
            ),
        ));
    }
    Ok(end)
}

/// Length of a quoted value (both quotes included) at the start of `rest`
fn scan_quoted(name: &str, rest: &str) -> RequestResult<usize> {
    let mut chars = rest.char_indices().skip(1);

    while let Some((i, c)) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some((_, '\\' | '"' | '?' | '*' | 'n')) => {}
                Some((_, other)) => {
                    return Err(RequestError::malformed_name(
                        name,
                        format!("invalid escape sequence '\\{}' in quoted value", other.escape_debug()),
                    ))
                }
                None => break,
            },
            '\n' => {
                return Err(RequestError::malformed_name(
                    name,
                    "newline in quoted value",
                ))
            }
            '"' => {
                let end = i + 1;
                if end < rest.len() && !rest[end..].starts_with(',') {
                    return Err(RequestError::malformed_name(
                        name,
                        "characters after closing quote",
                    ));
                }
                return Ok(end);
            }
            _ => {}
        }
    }

    Err(RequestError::malformed_name(name, "unterminated quoted value"))
}

fn value_has_wildcard(raw: &str) -> bool {
    if !raw.starts_with('"') {
        return raw.contains(['*', '?']);
    }
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                chars.next();
            }
            '*' | '?' => return true,
            _ => {}
        }
    }
    false
}

fn unquote(raw: &str) -> Cow<'_, str> {
    if raw.len() < 2 || !raw.starts_with('"') || !raw.ends_with('"') {
        return Cow::Borrowed(raw);
    }
    let inner = &raw[1..raw.len() - 1];
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('n') => out.push('\n'),
                Some(other) => out.push(other),
                None => {}
            }
        } else {
            out.push(c);
        }
    }
    Cow::Owned(out)
}

impl PartialEq for ObjectName {
    fn eq(&self, other: &Self) -> bool {
        self.domain == other.domain
            && self.property_list_pattern == other.property_list_pattern
            && self.properties.len() == other.properties.len()
            && self
                .properties
                .iter()
                .all(|(k, v)| other.property_value(k).as_deref() == Some(unquote(v).as_ref()))
    }
}

impl Eq for ObjectName {}

impl fmt::Display for ObjectName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical())
    }
}

impl FromStr for ObjectName {
    type Err = RequestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for ObjectName {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.canonical())
    }
}

impl<'de> Deserialize<'de> for ObjectName {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        ObjectName::parse(&s).map_err(serde::de::Error::custom)
    }
}
