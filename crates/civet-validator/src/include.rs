//! Include composition
//!
//! Fetches and merges `include` fragments into one flat document tree before
//! parsing. Composition is depth-first in declaration order: a fragment's own
//! includes land before the fragment, and the root document is merged last so
//! its keys win.
//!
//! Cycles are detected against the stack of fragments currently being
//! composed; a fragment legitimately reachable twice through disjoint paths
//! is composed once and silently skipped after that.

use crate::error::ValidateError;
use civet_core::diagnostics::{DiagnosticKind, Diagnostics};
use civet_core::model::IncludeRef;
use civet_parser::IncludeParser;
use serde_yaml::{Mapping, Value};
use std::collections::{HashMap, HashSet};

/// Fetches the document tree behind an include reference
///
/// Implementations own the I/O policy: filesystem lookup for local paths,
/// HTTP for remote URLs, an API client for project files, or a pre-fetched
/// map for hermetic use.
pub trait IncludeResolver {
    fn resolve(
        &mut self,
        reference: &IncludeRef,
    ) -> std::result::Result<Value, Box<dyn std::error::Error + Send + Sync>>;
}

/// Resolver backed by a pre-loaded identifier-to-tree map
///
/// Keys are canonical reference identifiers as produced by
/// [`IncludeRef::identifier`].
#[derive(Default)]
pub struct StaticResolver {
    fragments: HashMap<String, Value>,
}

impl StaticResolver {
    pub fn new() -> Self {
        StaticResolver::default()
    }

    /// Register a fragment under its reference
    pub fn insert(&mut self, reference: &IncludeRef, tree: Value) {
        self.fragments.insert(reference.identifier(), tree);
    }

    /// Register a YAML fragment under a local path
    pub fn insert_local(
        &mut self,
        path: impl Into<String>,
        source: &str,
    ) -> std::result::Result<(), serde_yaml::Error> {
        let tree = serde_yaml::from_str(source)?;
        self.insert(&IncludeRef::Local(path.into()), tree);
        Ok(())
    }
}

impl IncludeResolver for StaticResolver {
    fn resolve(
        &mut self,
        reference: &IncludeRef,
    ) -> std::result::Result<Value, Box<dyn std::error::Error + Send + Sync>> {
        self.fragments
            .get(&reference.identifier())
            .cloned()
            .ok_or_else(|| format!("no fragment registered for '{reference}'").into())
    }
}

/// Composes a document and its includes into one flat tree
pub struct FragmentComposer {
    active: Vec<String>,
    composed: HashSet<String>,
}

impl FragmentComposer {
    pub fn new() -> Self {
        FragmentComposer {
            active: Vec::new(),
            composed: HashSet::new(),
        }
    }

    /// Compose the root document with everything it transitively includes
    ///
    /// A fragment that cannot be fetched, is cyclic, or is not a mapping is
    /// recorded as a diagnostic and skipped; the rest of the tree still
    /// composes.
    pub fn compose(
        &mut self,
        root: &Value,
        resolver: &mut dyn IncludeResolver,
        diags: &mut Diagnostics,
    ) -> Value {
        let mut acc = Value::Mapping(Mapping::new());
        self.compose_includes(root, resolver, &mut acc, diags);
        merge_document(&mut acc, root);
        acc
    }

    fn compose_includes(
        &mut self,
        tree: &Value,
        resolver: &mut dyn IncludeResolver,
        acc: &mut Value,
        diags: &mut Diagnostics,
    ) {
        let Some(directive) = tree.get("include") else {
            return;
        };
        let includes = match IncludeParser::parse(directive, "include") {
            Ok(includes) => includes,
            Err(err) => {
                diags.error(err.diagnostic_kind(), "include", err.to_string());
                return;
            }
        };

        for include in includes {
            let id = include.reference.identifier();

            if self.active.contains(&id) {
                let mut chain: Vec<String> = self
                    .active
                    .iter()
                    .skip_while(|a| **a != id)
                    .cloned()
                    .collect();
                chain.push(id.clone());
                let err = ValidateError::IncludeCycle { chain };
                diags.error(err.diagnostic_kind(), "include", err.to_string());
                continue;
            }
            if !self.composed.insert(id.clone()) {
                log::debug!("include '{id}' already composed, skipping");
                continue;
            }

            let fragment = match resolver.resolve(&include.reference) {
                Ok(fragment) => fragment,
                Err(source) => {
                    let err = ValidateError::IncludeResolution {
                        reference: id.clone(),
                        source,
                    };
                    diags.error(err.diagnostic_kind(), "include", err.to_string());
                    continue;
                }
            };
            if !fragment.is_mapping() {
                diags.error(
                    DiagnosticKind::IncludeResolution,
                    "include",
                    format!("include '{id}' did not produce a mapping document"),
                );
                continue;
            }

            log::debug!("composing include '{id}'");
            self.active.push(id);
            self.compose_includes(&fragment, resolver, acc, diags);
            self.active.pop();
            merge_document(acc, &fragment);
        }
    }
}

impl Default for FragmentComposer {
    fn default() -> Self {
        FragmentComposer::new()
    }
}

/// Merge `overlay`'s top-level keys into `acc`, overlay winning
///
/// The `include` key is consumed by composition and never lands in the
/// output. `stages` accumulates across fragments instead of replacing, so a
/// shared fragment can contribute stages without erasing the root's.
fn merge_document(acc: &mut Value, overlay: &Value) {
    let Some(overlay_map) = overlay.as_mapping() else {
        return;
    };
    let Some(acc_map) = acc.as_mapping_mut() else {
        return;
    };

    for (key, value) in overlay_map {
        if key.as_str() == Some("include") {
            continue;
        }
        if key.as_str() == Some("stages") {
            let merged = merge_stages(acc_map.get("stages"), value);
            acc_map.insert(key.clone(), merged);
            continue;
        }
        match acc_map.get_mut(key) {
            Some(existing) => merge_value(existing, value),
            None => {
                acc_map.insert(key.clone(), value.clone());
            }
        }
    }
}

/// Recursive merge: mappings merge key-wise, everything else is replaced
fn merge_value(acc: &mut Value, overlay: &Value) {
    match (&mut *acc, overlay) {
        (Value::Mapping(acc_map), Value::Mapping(overlay_map)) => {
            for (key, value) in overlay_map {
                match acc_map.get_mut(key) {
                    Some(existing) => merge_value(existing, value),
                    None => {
                        acc_map.insert(key.clone(), value.clone());
                    }
                }
            }
        }
        _ => *acc = overlay.clone(),
    }
}

/// Concatenate stage lists, keeping the first occurrence of each name
fn merge_stages(existing: Option<&Value>, overlay: &Value) -> Value {
    let mut out: Vec<Value> = Vec::new();
    for source in [existing, Some(overlay)].into_iter().flatten() {
        match source {
            Value::Sequence(items) => {
                for item in items {
                    if !out.contains(item) {
                        out.push(item.clone());
                    }
                }
            }
            other => {
                if !out.contains(other) {
                    out.push(other.clone());
                }
            }
        }
    }
    Value::Sequence(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> Value {
        serde_yaml::from_str(s).unwrap()
    }

    #[test]
    fn test_root_wins_over_fragment() {
        let mut resolver = StaticResolver::new();
        resolver
            .insert_local("/a.yml", "job:\n  image: from-fragment\n  tags: [shared]\n")
            .unwrap();

        let root = v("include:\n  - local: /a.yml\njob:\n  image: from-root\n");
        let mut diags = Diagnostics::new();
        let composed = FragmentComposer::new().compose(&root, &mut resolver, &mut diags);

        assert!(!diags.has_errors());
        let job = composed.get("job").unwrap();
        assert_eq!(job.get("image").and_then(Value::as_str), Some("from-root"));
        // keys only the fragment sets survive the merge
        assert!(job.get("tags").is_some());
        assert!(composed.get("include").is_none());
    }

    #[test]
    fn test_stages_accumulate() {
        let mut resolver = StaticResolver::new();
        resolver
            .insert_local("/a.yml", "stages: [lint, build]\n")
            .unwrap();

        let root = v("include: /a.yml\nstages: [build, deploy]\n");
        let mut diags = Diagnostics::new();
        let composed = FragmentComposer::new().compose(&root, &mut resolver, &mut diags);

        let stages: Vec<&str> = composed
            .get("stages")
            .and_then(Value::as_sequence)
            .unwrap()
            .iter()
            .filter_map(Value::as_str)
            .collect();
        assert_eq!(stages, vec!["lint", "build", "deploy"]);
    }

    #[test]
    fn test_missing_fragment_is_diagnostic() {
        let root = v("include: /nope.yml\njob:\n  script: x\n");
        let mut diags = Diagnostics::new();
        let composed =
            FragmentComposer::new().compose(&root, &mut StaticResolver::new(), &mut diags);

        assert!(diags
            .iter()
            .any(|d| d.kind == DiagnosticKind::IncludeResolution));
        assert!(composed.get("job").is_some());
    }
}
