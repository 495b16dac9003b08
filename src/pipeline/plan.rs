//! Step planning.
//!
//! The plan is the provider's base chain followed by each requested format's
//! chain, keeping only the first occurrence of every step. A step keeps the
//! position of the first chain that needs it.

use std::collections::HashSet;

use super::catalog::{base_format, format_steps};
use crate::build::context::{FormatSet, Provider};
use crate::steps::Step;

/// Compute the ordered, duplicate-free step sequence for a build.
///
/// Pure: depends only on `provider` and `formats`.
pub fn plan(provider: Provider, formats: &FormatSet) -> Vec<Step> {
    let chains = std::iter::once(base_format(provider))
        .chain(formats.iter())
        .map(format_steps);

    let mut seen = HashSet::new();
    let mut steps = Vec::new();
    for chain in chains {
        for &step in chain {
            if seen.insert(step) {
                steps.push(step);
            }
        }
    }
    steps
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::context::Format;
    use crate::steps::Step::*;

    fn formats(names: &[&str]) -> FormatSet {
        FormatSet::parse(names).unwrap()
    }

    #[test]
    fn raw_only_for_raw_provider() {
        assert_eq!(
            plan(Provider::Hyperkit, &formats(&["raw"])),
            vec![BuildImage, ExportFilesystem, AssembleRaw]
        );
    }

    #[test]
    fn qcow2_for_raw_provider() {
        assert_eq!(
            plan(Provider::Kvm, &formats(&["qcow2"])),
            vec![BuildImage, ExportFilesystem, AssembleRaw, BuildIso, ConvertQcow2, Cleanup]
        );
    }

    #[test]
    fn base_chain_keeps_first_seen_position() {
        // The virtualbox base chain already places cleanup before conversion.
        assert_eq!(
            plan(Provider::Virtualbox, &formats(&["qcow2"])),
            vec![BuildImage, ExportFilesystem, AssembleRaw, BuildIso, Cleanup, ConvertQcow2]
        );
    }

    #[test]
    fn requested_order_decides_positions() {
        assert_eq!(
            plan(Provider::Hyperkit, &formats(&["iso", "qcow2"])),
            vec![BuildImage, ExportFilesystem, AssembleRaw, BuildIso, Cleanup, ConvertQcow2]
        );
    }

    #[test]
    fn deterministic_and_duplicate_free() {
        let all = [
            vec!["raw"],
            vec!["iso"],
            vec!["qcow2"],
            vec!["qcow2", "raw"],
            vec!["iso", "raw", "qcow2"],
            vec!["raw", "qcow2", "iso"],
        ];
        for provider in Provider::ALL {
            for names in &all {
                let set = formats(names);
                let first = plan(provider, &set);
                assert_eq!(first, plan(provider, &set));

                let unique: HashSet<_> = first.iter().collect();
                assert_eq!(unique.len(), first.len(), "{provider} {names:?}");

                for format in set.iter() {
                    for step in format_steps(format) {
                        assert!(first.contains(step), "{provider} {names:?} missing {step}");
                    }
                }
            }
        }
    }

    #[test]
    fn catalog_order_is_respected_for_producing_steps() {
        // If A precedes B in every chain containing both, A precedes B in the
        // plan. Cleanup is exempt: it keeps the slot of the first chain that
        // lists it, which may come before a later chain's conversion.
        let chains = [Format::Raw, Format::Iso, Format::Qcow2].map(format_steps);
        let sets = [
            formats(&["raw"]),
            formats(&["qcow2", "iso"]),
            formats(&["iso", "raw"]),
            formats(&["raw", "iso", "qcow2"]),
        ];
        for provider in Provider::ALL {
            for set in &sets {
                let planned = plan(provider, set);
                let pos = |s: &Step| planned.iter().position(|p| p == s);
                let producing: Vec<_> = planned.iter().filter(|s| **s != Cleanup).collect();
                for &a in &producing {
                    for &b in &producing {
                        let containing: Vec<_> = chains
                            .iter()
                            .filter(|c| c.contains(a) && c.contains(b))
                            .collect();
                        let always_before = !containing.is_empty()
                            && containing.iter().all(|c| {
                                c.iter().position(|s| s == a) < c.iter().position(|s| s == b)
                            });
                        if always_before {
                            assert!(pos(a) < pos(b), "{provider}: {a} should precede {b}");
                        }
                    }
                }
            }
        }
    }
}
