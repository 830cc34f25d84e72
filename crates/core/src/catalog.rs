//! Keyed string catalog. The resolver core only ever selects a key and
//! positional arguments; the strings themselves are replaceable by loading
//! another catalog file.

use std::collections::HashMap;

use anyhow::{Context, Result};
use once_cell::sync::Lazy;

static ENGLISH: Lazy<Catalog> = Lazy::new(|| {
    Catalog::from_toml(include_str!("../messages/en.toml"))
        .expect("embedded message catalog is valid")
});

#[derive(Debug, Clone, Default)]
pub struct Catalog {
    map: HashMap<String, String>,
}

impl Catalog {
    /// The built-in English catalog.
    pub fn english() -> &'static Catalog {
        &ENGLISH
    }

    /// Parse a catalog from TOML. Sections become dotted key prefixes:
    /// `[search] nothing = ".."` is looked up as `search.nothing`.
    pub fn from_toml(source: &str) -> Result<Catalog> {
        let value: toml::Value = source.parse().context("message catalog is not valid TOML")?;
        let table = value
            .as_table()
            .context("message catalog must be a table")?;

        let mut map = HashMap::new();
        for (section, entries) in table {
            match entries {
                toml::Value::Table(entries) => {
                    for (key, value) in entries {
                        if let Some(s) = value.as_str() {
                            map.insert(format!("{section}.{key}"), s.to_string());
                        }
                    }
                }
                toml::Value::String(s) => {
                    map.insert(section.clone(), s.clone());
                }
                _ => {}
            }
        }
        Ok(Catalog { map })
    }

    /// Look up a message and substitute `$1`..`$9`. An unknown key returns
    /// the key itself so a missing translation stays visible instead of
    /// failing a resolution.
    pub fn get(&self, key: &str, args: &[&str]) -> String {
        let Some(template) = self.map.get(key) else {
            return key.to_string();
        };
        let mut out = template.clone();
        for (i, arg) in args.iter().enumerate().take(9) {
            out = out.replace(&format!("${}", i + 1), arg);
        }
        out
    }
}
