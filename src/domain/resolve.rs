//! Marker-to-check resolution
//!
//! Builds the check graph for a whole project in two passes over the full,
//! flattened set of (file, marker) occurrences:
//!
//! 1. Instantiate: every occurrence gets a check. Composites start empty.
//! 2. Wire: each composite looks up its `ids` across all files and appends
//!    the checks bound to those markers, in `ids` order.
//!
//! Pass 2 may reference a marker declared later or in another file, so it
//! only starts once pass 1 has covered every occurrence.
//!
//! Composites that end up in a reference cycle are replaced by
//! `Unknown(CyclicReference)`. Composites outside the cycle that point into
//! it keep their edge and therefore see the unknown check.

use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};

use super::check::{Check, CheckId, CompositeCheck, UnknownReason, UrlCheck};
use super::marker::{Marker, DEFAULT_TEST_ID};

/// A marker found in a specific file
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Occurrence {
    file: PathBuf,
    marker: Marker,
}

impl Occurrence {
    pub fn new(file: impl Into<PathBuf>, marker: Marker) -> Self {
        Self {
            file: file.into(),
            marker,
        }
    }

    pub fn file(&self) -> &Path {
        &self.file
    }

    pub fn marker(&self) -> &Marker {
        &self.marker
    }
}

/// The resolved check graph
///
/// Occurrences are ordered by file path, then by first position in the file.
/// Every occurrence is bound to exactly one check.
#[derive(Debug, Default)]
pub struct Resolution {
    occurrences: Vec<Occurrence>,
    bindings: Vec<CheckId>,
    index: HashMap<Occurrence, usize>,
    checks: Vec<Check>,
    cycles: Vec<Vec<CheckId>>,
}

impl Resolution {
    /// Number of occurrences
    pub fn len(&self) -> usize {
        self.occurrences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.occurrences.is_empty()
    }

    /// Iterates occurrences with their bound check, in resolution order
    pub fn iter(&self) -> impl Iterator<Item = (&Occurrence, CheckId, &Check)> {
        self.occurrences
            .iter()
            .zip(&self.bindings)
            .map(|(occurrence, &id)| (occurrence, id, &self.checks[id.0]))
    }

    pub fn occurrences(&self) -> &[Occurrence] {
        &self.occurrences
    }

    /// The check arena. Indices are [`CheckId`]s.
    pub fn checks(&self) -> &[Check] {
        &self.checks
    }

    pub fn check(&self, id: CheckId) -> &Check {
        &self.checks[id.0]
    }

    /// Check bound to an occurrence, if the occurrence was part of the input
    pub fn check_id_for(&self, occurrence: &Occurrence) -> Option<CheckId> {
        self.index.get(occurrence).map(|&i| self.bindings[i])
    }

    pub fn check_for(&self, occurrence: &Occurrence) -> Option<&Check> {
        self.check_id_for(occurrence).map(|id| self.check(id))
    }

    /// Groups of composite checks that referenced each other and were
    /// degraded to unknown
    pub fn cycles(&self) -> &[Vec<CheckId>] {
        &self.cycles
    }
}

/// Builds the check graph for all markers of a project
///
/// Total over its input: unresolvable references and unrecognized test kinds
/// degrade to unknown checks instead of failing. When several markers declare
/// the same id, the first in resolution order wins.
pub fn resolve(files: &BTreeMap<PathBuf, Vec<Marker>>) -> Resolution {
    let mut builder = Builder::default();

    builder.flatten(files);
    builder.instantiate();
    builder.wire_composites();
    builder.break_cycles();

    log::debug!(
        "Resolved {} occurrences into {} checks ({} cycles)",
        builder.resolution.occurrences.len(),
        builder.resolution.checks.len(),
        builder.resolution.cycles.len()
    );

    builder.resolution
}

#[derive(Default)]
struct Builder {
    resolution: Resolution,
    /// Shared sentinels, one per distinct reason
    unknowns: HashMap<UnknownReason, CheckId>,
}

impl Builder {
    fn flatten(&mut self, files: &BTreeMap<PathBuf, Vec<Marker>>) {
        let mut seen = HashSet::new();

        for (file, markers) in files {
            for marker in markers {
                let occurrence = Occurrence::new(file.clone(), marker.clone());
                if seen.insert(occurrence.clone()) {
                    self.resolution.occurrences.push(occurrence);
                }
            }
        }
    }

    fn push(&mut self, check: Check) -> CheckId {
        let id = CheckId(self.resolution.checks.len());
        self.resolution.checks.push(check);
        id
    }

    fn unknown(&mut self, reason: UnknownReason) -> CheckId {
        if let Some(&id) = self.unknowns.get(&reason) {
            return id;
        }
        let id = self.push(Check::unknown(reason.clone()));
        self.unknowns.insert(reason, id);
        id
    }

    /// Pass 1: bind every occurrence to a fresh check
    fn instantiate(&mut self) {
        let occurrences = std::mem::take(&mut self.resolution.occurrences);

        for (i, occurrence) in occurrences.iter().enumerate() {
            let marker = occurrence.marker();

            let id = if marker.is_composite() {
                self.push(Check::Composite(CompositeCheck::new()))
            } else if marker.test_id() == DEFAULT_TEST_ID {
                let argument = marker.argument().unwrap_or_default();
                self.push(Check::Url(UrlCheck::new(occurrence.file(), argument)))
            } else {
                log::debug!(
                    "Unrecognized test '{}' in {}",
                    marker.test_id(),
                    occurrence.file().display()
                );
                self.unknown(UnknownReason::UnrecognizedTest(marker.test_id().to_string()))
            };

            self.resolution.bindings.push(id);
            self.resolution.index.insert(occurrence.clone(), i);
        }

        self.resolution.occurrences = occurrences;
    }

    /// Maps each declared id to the first occurrence declaring it
    fn id_index(&self) -> HashMap<String, usize> {
        let mut index: HashMap<String, usize> = HashMap::new();

        for (i, occurrence) in self.resolution.occurrences.iter().enumerate() {
            let Some(id) = occurrence.marker().id() else {
                continue;
            };

            match index.get(id) {
                Some(&first) => log::warn!(
                    "Marker id '{}' in {} is shadowed by the same id in {}",
                    id,
                    occurrence.file().display(),
                    self.resolution.occurrences[first].file().display()
                ),
                None => {
                    index.insert(id.to_string(), i);
                }
            }
        }

        index
    }

    /// Pass 2: fill composites with the checks bound to their referenced ids
    fn wire_composites(&mut self) {
        let ids = self.id_index();

        for i in 0..self.resolution.occurrences.len() {
            let marker = self.resolution.occurrences[i].marker();
            if !marker.is_composite() {
                continue;
            }

            let references = marker.ids().to_vec();
            let mut subs = Vec::with_capacity(references.len());

            for reference in references {
                let sub = match ids.get(&reference) {
                    Some(&target) => self.resolution.bindings[target],
                    None => {
                        log::debug!(
                            "Composite in {} references unknown id '{}'",
                            self.resolution.occurrences[i].file().display(),
                            reference
                        );
                        self.unknown(UnknownReason::MissingReference(reference))
                    }
                };
                subs.push(sub);
            }

            let own = self.resolution.bindings[i];
            if let Check::Composite(composite) = &mut self.resolution.checks[own.0] {
                for sub in subs {
                    composite.push(sub);
                }
            }
        }
    }

    /// Replaces every composite that takes part in a cycle by an unknown check
    fn break_cycles(&mut self) {
        let checks = &self.resolution.checks;

        let mut graph: DiGraph<CheckId, ()> = DiGraph::new();
        let mut nodes: HashMap<CheckId, NodeIndex> = HashMap::new();

        for (i, check) in checks.iter().enumerate() {
            if check.as_composite().is_some() {
                nodes.insert(CheckId(i), graph.add_node(CheckId(i)));
            }
        }

        for (i, check) in checks.iter().enumerate() {
            let Some(composite) = check.as_composite() else {
                continue;
            };
            let from = nodes[&CheckId(i)];
            for sub in composite.checks() {
                if let Some(&to) = nodes.get(sub) {
                    graph.update_edge(from, to, ());
                }
            }
        }

        let mut cycles = Vec::new();
        for component in tarjan_scc(&graph) {
            let cyclic = component.len() > 1
                || component
                    .first()
                    .is_some_and(|&node| graph.contains_edge(node, node));

            if cyclic {
                let mut members: Vec<CheckId> = component.iter().map(|&node| graph[node]).collect();
                members.sort();
                cycles.push(members);
            }
        }
        cycles.sort();

        for members in &cycles {
            log::warn!("Composite checks {:?} reference each other; marking them unknown", members);
            for member in members {
                self.resolution.checks[member.0] = Check::unknown(UnknownReason::CyclicReference);
            }
        }

        self.resolution.cycles = cycles;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::marker::parse;

    fn project(files: &[(&str, &str)]) -> BTreeMap<PathBuf, Vec<Marker>> {
        files
            .iter()
            .map(|(path, text)| (PathBuf::from(path), parse(text).unwrap()))
            .collect()
    }

    fn occurrence(file: &str, raw: &str) -> Occurrence {
        Occurrence::new(file, raw.parse().unwrap())
    }

    fn sub_checks<'a>(resolution: &'a Resolution, file: &str, raw: &str) -> Vec<&'a Check> {
        let check = resolution.check_for(&occurrence(file, raw)).unwrap();
        let composite = check.as_composite().expect("composite check");
        composite.checks().iter().map(|&id| resolution.check(id)).collect()
    }

    #[test]
    fn primitive_becomes_url_check() {
        let resolution = resolve(&project(&[(
            "README.md",
            "!DACDOC[Example](http://example.com);id=a!",
        )]));

        assert_eq!(resolution.len(), 1);
        let check = resolution
            .check_for(&occurrence("README.md", "!DACDOC[Example](http://example.com);id=a!"))
            .unwrap();
        match check {
            Check::Url(url) => {
                assert_eq!(url.uri(), "http://example.com");
                assert_eq!(url.file(), Path::new("README.md"));
            }
            other => panic!("expected url check, got {:?}", other),
        }
    }

    #[test]
    fn unrecognized_test_is_unknown() {
        let resolution = resolve(&project(&[("a.md", "!DACDOC cargo test;test=dacdoc-shell!")]));

        let check = resolution
            .check_for(&occurrence("a.md", "!DACDOC cargo test;test=dacdoc-shell!"))
            .unwrap();
        assert_eq!(
            check,
            &Check::unknown(UnknownReason::UnrecognizedTest("dacdoc-shell".to_string()))
        );
    }

    #[test]
    fn composite_wires_in_ids_order() {
        let resolution = resolve(&project(&[(
            "a.md",
            "!DACDOC http://one.example;id=one! !DACDOC http://two.example;id=two! !DACDOC ids=two,one!",
        )]));

        let subs = sub_checks(&resolution, "a.md", "!DACDOC ids=two,one!");
        assert_eq!(subs.len(), 2);
        assert!(matches!(subs[0], Check::Url(url) if url.uri() == "http://two.example"));
        assert!(matches!(subs[1], Check::Url(url) if url.uri() == "http://one.example"));
    }

    #[test]
    fn missing_reference_degrades_to_unknown() {
        let resolution = resolve(&project(&[
            ("a.md", "!DACDOC ids=a,b!"),
            ("b.md", "!DACDOC http://a.example;id=a!"),
        ]));

        let subs = sub_checks(&resolution, "a.md", "!DACDOC ids=a,b!");
        assert_eq!(subs.len(), 2);
        assert!(matches!(subs[0], Check::Url(url) if url.uri() == "http://a.example"));
        assert_eq!(
            subs[1],
            &Check::unknown(UnknownReason::MissingReference("b".to_string()))
        );
    }

    #[test]
    fn forward_reference_across_files() {
        // composite sorts first, its target lives in a later file
        let resolution = resolve(&project(&[
            ("0-index.md", "!DACDOC ids=late!"),
            ("z/deep.md", "!DACDOC ../x.md;id=late!"),
        ]));

        let subs = sub_checks(&resolution, "0-index.md", "!DACDOC ids=late!");
        assert!(matches!(subs[0], Check::Url(url) if url.file() == Path::new("z/deep.md")));
    }

    #[test]
    fn referenced_check_is_shared() {
        let resolution = resolve(&project(&[
            ("a.md", "!DACDOC http://x.example;id=x! !DACDOC ids=x!"),
            ("b.md", "!DACDOC ids=x;id=bx!"),
        ]));

        let primitive = resolution
            .check_id_for(&occurrence("a.md", "!DACDOC http://x.example;id=x!"))
            .unwrap();
        for (file, raw) in [("a.md", "!DACDOC ids=x!"), ("b.md", "!DACDOC ids=x;id=bx!")] {
            let id = resolution.check_id_for(&occurrence(file, raw)).unwrap();
            let composite = resolution.check(id).as_composite().unwrap();
            assert_eq!(composite.checks(), [primitive]);
        }
    }

    #[test]
    fn repeated_missing_references_share_one_sentinel() {
        let resolution = resolve(&project(&[("a.md", "!DACDOC ids=nope! !DACDOC ids=nope,nope;id=c!")]));

        let first = resolution
            .check_id_for(&occurrence("a.md", "!DACDOC ids=nope!"))
            .unwrap();
        let second = resolution
            .check_id_for(&occurrence("a.md", "!DACDOC ids=nope,nope;id=c!"))
            .unwrap();
        let a = resolution.check(first).as_composite().unwrap().checks()[0];
        let b = resolution.check(second).as_composite().unwrap().checks();
        assert_eq!(b, [a, a]);
    }

    #[test]
    fn duplicate_id_prefers_first_file() {
        let files = project(&[
            ("c.md", "!DACDOC ids=x!"),
            ("b.md", "!DACDOC http://b.example;id=x!"),
            ("a.md", "!DACDOC http://a.example;id=x!"),
        ]);

        for _ in 0..5 {
            let resolution = resolve(&files);
            let subs = sub_checks(&resolution, "c.md", "!DACDOC ids=x!");
            assert!(matches!(subs[0], Check::Url(url) if url.uri() == "http://a.example"));
        }
    }

    #[test]
    fn duplicate_id_in_one_file_prefers_first_position() {
        let resolution = resolve(&project(&[(
            "a.md",
            "!DACDOC http://second.example;id=x! !DACDOC http://first.example; id=x! !DACDOC ids=x!",
        )]));

        let subs = sub_checks(&resolution, "a.md", "!DACDOC ids=x!");
        assert!(matches!(subs[0], Check::Url(url) if url.uri() == "http://second.example"));
    }

    #[test]
    fn identical_markers_in_one_file_are_one_occurrence() {
        let mut files = BTreeMap::new();
        let marker: Marker = "!DACDOC http://x.example!".parse().unwrap();
        files.insert(PathBuf::from("a.md"), vec![marker.clone(), marker.clone()]);
        files.insert(PathBuf::from("b.md"), vec![marker]);

        let resolution = resolve(&files);
        assert_eq!(resolution.len(), 2);
    }

    #[test]
    fn every_occurrence_is_bound() {
        let resolution = resolve(&project(&[
            ("a.md", "!DACDOC x;id=a! !DACDOC y;test=other! !DACDOC ids=a,zz;id=c!"),
            ("b.md", "!DACDOC ids=c,a! !DACDOC ids=self;id=self!"),
        ]));

        assert_eq!(resolution.len(), 5);
        for occurrence in resolution.occurrences() {
            assert!(resolution.check_for(occurrence).is_some());
        }
        assert_eq!(resolution.iter().count(), 5);
    }

    #[test]
    fn composite_length_matches_ids() {
        let resolution = resolve(&project(&[("a.md", "!DACDOC x;id=a! !DACDOC ids=a,b,a,c!")]));
        assert_eq!(sub_checks(&resolution, "a.md", "!DACDOC ids=a,b,a,c!").len(), 4);
    }

    #[test]
    fn mutual_cycle_degrades_members() {
        let resolution = resolve(&project(&[
            ("a.md", "!DACDOC ids=b;id=a!"),
            ("b.md", "!DACDOC ids=a;id=b!"),
            ("c.md", "!DACDOC ids=a;id=c!"),
        ]));

        let cyclic = Check::unknown(UnknownReason::CyclicReference);
        assert_eq!(resolution.check_for(&occurrence("a.md", "!DACDOC ids=b;id=a!")), Some(&cyclic));
        assert_eq!(resolution.check_for(&occurrence("b.md", "!DACDOC ids=a;id=b!")), Some(&cyclic));

        // c is outside the cycle: still a composite, pointing at the degraded check
        let subs = sub_checks(&resolution, "c.md", "!DACDOC ids=a;id=c!");
        assert_eq!(subs, vec![&cyclic]);
        assert_eq!(resolution.cycles().len(), 1);
        assert_eq!(resolution.cycles()[0].len(), 2);
    }

    #[test]
    fn self_reference_is_a_cycle() {
        let resolution = resolve(&project(&[("a.md", "!DACDOC ids=me;id=me!")]));

        assert_eq!(
            resolution.check_for(&occurrence("a.md", "!DACDOC ids=me;id=me!")),
            Some(&Check::unknown(UnknownReason::CyclicReference))
        );
        assert_eq!(resolution.cycles().len(), 1);
    }

    #[test]
    fn nested_composites_without_cycle_survive() {
        let resolution = resolve(&project(&[(
            "a.md",
            "!DACDOC x;id=leaf! !DACDOC ids=leaf;id=mid! !DACDOC ids=mid,leaf;id=top!",
        )]));

        assert!(resolution.cycles().is_empty());
        let subs = sub_checks(&resolution, "a.md", "!DACDOC ids=mid,leaf;id=top!");
        assert!(subs[0].as_composite().is_some());
        assert!(matches!(subs[1], Check::Url(_)));
    }

    #[test]
    fn empty_project() {
        let resolution = resolve(&BTreeMap::new());
        assert!(resolution.is_empty());
        assert!(resolution.checks().is_empty());
    }
}
