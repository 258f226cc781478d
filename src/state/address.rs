//! Resource and instance addresses.
//!
//! Addresses are the textual form used by plans and change files:
//! `module.net.aws_instance.web[0]`, `aws_instance.web["blue"]`,
//! `data.aws_ami.ubuntu`.

use std::fmt;

use super::types::{IndexKey, Mode, ResourceState};

/// A fully qualified resource instance address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceAddress {
    /// Module path, empty for the root module.
    pub module: String,
    /// Resource mode.
    pub mode: Mode,
    /// Resource type.
    pub resource_type: String,
    /// Resource name.
    pub name: String,
    /// Instance key.
    pub index_key: IndexKey,
}

/// Result of parsing an address string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedAddress {
    /// `base[N]` or `base["key"]`.
    Indexed {
        /// Address without the index suffix.
        base: String,
        /// The parsed key.
        key: IndexKey,
    },
    /// An address with no index suffix at all.
    Unindexed(String),
    /// Anything else.
    Invalid,
}

impl ParsedAddress {
    /// Parses an address.
    ///
    /// Only two indexed forms are recognized: `base["key"]` where the key is
    /// a non-empty run of characters other than `"`, and `base[N]` where `N`
    /// is a non-negative decimal integer. The base never contains `[`.
    #[must_use]
    pub fn parse(address: &str) -> Self {
        let Some(open) = address.find('[') else {
            return if address.is_empty() {
                Self::Invalid
            } else {
                Self::Unindexed(address.to_string())
            };
        };

        let base = &address[..open];
        let Some(inner) = address[open + 1..].strip_suffix(']') else {
            return Self::Invalid;
        };
        if base.is_empty() {
            return Self::Invalid;
        }

        let key = if let Some(quoted) = inner
            .strip_prefix('"')
            .and_then(|rest| rest.strip_suffix('"'))
        {
            if quoted.is_empty() || quoted.contains('"') {
                return Self::Invalid;
            }
            IndexKey::string(quoted)
        } else if !inner.is_empty() && inner.bytes().all(|b| b.is_ascii_digit()) {
            match inner.parse::<i64>() {
                Ok(n) => IndexKey::Int(n),
                Err(_) => return Self::Invalid,
            }
        } else {
            return Self::Invalid;
        };

        Self::Indexed {
            base: base.to_string(),
            key,
        }
    }

    /// Returns the address without its index suffix, if one could be parsed.
    #[must_use]
    pub fn base(&self) -> Option<&str> {
        match self {
            Self::Indexed { base, .. } | Self::Unindexed(base) => Some(base),
            Self::Invalid => None,
        }
    }

    /// Returns the parsed key, if the address was indexed.
    #[must_use]
    pub const fn index_key(&self) -> Option<&IndexKey> {
        match self {
            Self::Indexed { key, .. } => Some(key),
            Self::Unindexed(_) | Self::Invalid => None,
        }
    }
}

/// Formats an address from its parts.
///
/// Data sources never carry an index suffix, whatever key is passed.
#[must_use]
pub fn format_address(
    module: &str,
    mode: Mode,
    resource_type: &str,
    name: &str,
    index_key: &IndexKey,
) -> String {
    let mut out = String::new();
    if !module.is_empty() {
        out.push_str(module);
        out.push('.');
    }
    if mode == Mode::Data {
        out.push_str("data.");
    }
    out.push_str(resource_type);
    out.push('.');
    out.push_str(name);

    if mode == Mode::Data {
        return out;
    }

    match index_key {
        IndexKey::None => {}
        IndexKey::Int(n) => {
            out.push('[');
            out.push_str(&n.to_string());
            out.push(']');
        }
        IndexKey::Str(s) => {
            out.push_str("[\"");
            out.push_str(s);
            out.push_str("\"]");
        }
    }
    out
}

impl ResourceState {
    /// Returns the bare (unindexed) address of this resource.
    #[must_use]
    pub fn addr(&self) -> String {
        self.instance_addr(&IndexKey::None)
    }

    /// Returns the address of an instance of this resource with the given key.
    #[must_use]
    pub fn instance_addr(&self, index_key: &IndexKey) -> String {
        format_address(
            &self.module,
            self.mode,
            &self.resource_type,
            &self.name,
            index_key,
        )
    }

    /// Returns the structured address of an instance of this resource.
    #[must_use]
    pub fn address(&self, index_key: &IndexKey) -> ResourceAddress {
        ResourceAddress {
            module: self.module.clone(),
            mode: self.mode,
            resource_type: self.resource_type.clone(),
            name: self.name.clone(),
            index_key: index_key.clone(),
        }
    }
}

impl fmt::Display for ResourceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_address(
            &self.module,
            self.mode,
            &self.resource_type,
            &self.name,
            &self.index_key,
        ))
    }
}
