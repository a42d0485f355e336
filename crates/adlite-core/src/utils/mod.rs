//! Distinguished name helpers

use crate::{Error, Result};

/// Normalize a DN for comparison: lowercase, no padding around separators
pub fn normalize_dn(dn: &str) -> String {
    split_rdns(dn)
        .iter()
        .map(|rdn| match rdn.split_once('=') {
            Some((attr, value)) => format!(
                "{}={}",
                attr.trim().to_ascii_lowercase(),
                value.trim().to_ascii_lowercase()
            ),
            None => rdn.trim().to_ascii_lowercase(),
        })
        .collect::<Vec<_>>()
        .join(",")
}

/// `dc=test,dc=com` -> `test.com`
pub fn domain_from_base_dn(base_dn: &str) -> String {
    split_rdns(base_dn)
        .iter()
        .filter_map(|rdn| rdn.split_once('='))
        .filter(|(attr, _)| attr.trim().eq_ignore_ascii_case("dc"))
        .map(|(_, value)| value.trim().to_ascii_lowercase())
        .collect::<Vec<_>>()
        .join(".")
}

/// Build `cn=<name>,<base_dn>`, escaping DN special characters in `name`
pub fn entry_dn(name: &str, base_dn: &str) -> String {
    format!("cn={},{}", escape_rdn_value(name), base_dn)
}

/// Extract the principal from a bind DN of the form `cn=<principal>,<base_dn>`
pub fn principal_from_bind_dn(dn: &str, base_dn: &str) -> Result<String> {
    let rdns = split_rdns(dn);
    let (first, rest) = rdns
        .split_first()
        .ok_or_else(|| Error::InvalidDn(dn.to_string()))?;

    let (attr, value) = first
        .split_once('=')
        .ok_or_else(|| Error::InvalidDn(dn.to_string()))?;

    if !attr.trim().eq_ignore_ascii_case("cn") {
        return Err(Error::InvalidDn(format!("{} (expected cn=<principal>)", dn)));
    }

    if normalize_dn(&rest.join(",")) != normalize_dn(base_dn) {
        return Err(Error::InvalidDn(format!("{} is outside {}", dn, base_dn)));
    }

    let principal = unescape_rdn_value(value.trim());
    if principal.is_empty() || principal.len() > crate::MAX_PRINCIPAL_LENGTH {
        return Err(Error::InvalidDn(dn.to_string()));
    }

    Ok(principal)
}

/// Split a DN on unescaped commas, keeping escapes intact
fn split_rdns(dn: &str) -> Vec<String> {
    let mut rdns = Vec::new();
    let mut current = String::new();
    let mut escaped = false;

    for c in dn.chars() {
        match c {
            _ if escaped => {
                current.push(c);
                escaped = false;
            }
            '\\' => {
                current.push(c);
                escaped = true;
            }
            ',' => rdns.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }

    if !current.trim().is_empty() || !rdns.is_empty() {
        rdns.push(current);
    }

    rdns.into_iter()
        .map(|r| r.trim().to_string())
        .filter(|r| !r.is_empty())
        .collect()
}

fn escape_rdn_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, ',' | '+' | '"' | '\\' | '<' | '>' | ';' | '=') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn unescape_rdn_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(c);
        }
    }
    out
}
