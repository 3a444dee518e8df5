//! Need records as exported by the documentation toolchain.

use serde::{Deserialize, Deserializer};

/// A requirement/traceability record.
///
/// Fields mirror one entry of the `needs` object in a `needs.json` snapshot.
/// Everything is optional on the wire: missing keys and JSON `null` both
/// produce the field's default, so a sparse or partially filled record never
/// fails the whole snapshot.
///
/// # Examples
///
/// ```
/// use scl_core::Need;
///
/// let need: Need = serde_json::from_str(r#"{
///     "id": "REQ_001",
///     "type": "req",
///     "status": "valid",
///     "lineno": 12,
///     "links": "REQ_002, REQ_003"
/// }"#).unwrap();
///
/// assert_eq!(need.id, "REQ_001");
/// assert_eq!(need.lineno, Some(12));
/// assert_eq!(need.links.as_slice(), ["REQ_002", "REQ_003"]);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Need {
    #[serde(deserialize_with = "null_as_default")]
    pub id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(rename = "type", deserialize_with = "null_as_default")]
    pub need_type: String,
    #[serde(deserialize_with = "null_as_default")]
    pub type_name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub req_type: String,
    #[serde(deserialize_with = "null_as_default")]
    pub status: String,
    #[serde(deserialize_with = "null_as_default")]
    pub safety: String,
    #[serde(deserialize_with = "null_as_default")]
    pub security: String,
    #[serde(deserialize_with = "null_as_default")]
    pub content: String,
    /// Source document name, relative to the documentation root and without extension.
    #[serde(deserialize_with = "null_as_default")]
    pub docname: String,
    #[serde(deserialize_with = "null_as_default")]
    pub doctype: String,
    /// 1-based line of the need directive inside `docname`. Values that are
    /// not a non-negative integer (or a string holding one) read as `None`.
    #[serde(deserialize_with = "lenient_lineno")]
    pub lineno: Option<u32>,
    #[serde(deserialize_with = "null_as_default")]
    pub section_name: String,
    /// `YES`, `PARTIAL` or `NO`.
    #[serde(deserialize_with = "null_as_default")]
    pub implemented: String,
    #[serde(deserialize_with = "null_as_default")]
    pub rationale: String,
    #[serde(deserialize_with = "null_as_default")]
    pub hash: String,
    #[serde(deserialize_with = "null_as_default")]
    pub is_external: bool,
    #[serde(deserialize_with = "null_as_default")]
    pub req_covered: bool,
    #[serde(deserialize_with = "null_as_default")]
    pub test_covered: bool,
    #[serde(deserialize_with = "null_as_default")]
    pub parent_covered: String,
    #[serde(deserialize_with = "null_as_default")]
    pub parent_has_problem: String,

    pub tags: StringList,
    pub approvers: StringList,
    pub reviewers: StringList,
    pub source_code_link: StringList,
    #[serde(rename = "testlink")]
    pub test_link: StringList,

    // Links to other needs, in snapshot order.
    pub links: StringList,
    pub realizes: StringList,
    pub satisfies: StringList,
    pub contains: StringList,
    pub has: StringList,
    pub input: StringList,
    pub output: StringList,
    pub responsible: StringList,
    pub approved_by: StringList,
    pub supported_by: StringList,
    pub complies: StringList,
    pub fulfils: StringList,
    pub implements: StringList,
    pub uses: StringList,
    pub includes: StringList,
    pub included_by: StringList,
}

impl Need {
    /// Plain-text summary shown on hover and in completion details.
    ///
    /// ```
    /// use scl_core::Need;
    ///
    /// let need = Need {
    ///     need_type: "req".into(),
    ///     status: "valid".into(),
    ///     implemented: "YES".into(),
    ///     ..Need::default()
    /// };
    /// assert_eq!(need.summary(), "Type: req\nStatus: valid\nImplemented: YES");
    /// ```
    pub fn summary(&self) -> String {
        format!(
            "Type: {}\nStatus: {}\nImplemented: {}",
            self.need_type, self.status, self.implemented
        )
    }
}

/// Ordered list of strings that accepts either a JSON array or a single
/// comma-separated string.
///
/// Snapshot exporters are inconsistent about list-valued options: the same
/// field may arrive as `["A", "B"]`, as `"A, B"`, as `""` or as `null`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StringList(Vec<String>);

impl StringList {
    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, String> {
        self.0.iter()
    }
}

impl From<Vec<String>> for StringList {
    fn from(items: Vec<String>) -> Self {
        Self(items)
    }
}

impl<'de> Deserialize<'de> for StringList {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawList {
            Items(Vec<String>),
            Joined(String),
        }

        let items = match Option::<RawList>::deserialize(deserializer)? {
            None => Vec::new(),
            Some(RawList::Items(items)) => items,
            Some(RawList::Joined(joined)) if joined.is_empty() => Vec::new(),
            Some(RawList::Joined(joined)) => joined
                .split(',')
                .map(|item| item.trim().to_string())
                .collect(),
        };
        Ok(Self(items))
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn lenient_lineno<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    let lineno = match &value {
        serde_json::Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    if lineno.is_none() && !value.is_null() {
        tracing::debug!("ignoring unusable lineno {}", value);
    }
    Ok(lineno)
}
