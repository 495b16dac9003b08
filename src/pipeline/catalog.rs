//! Static step catalog.
//!
//! Each format maps to the full chain of steps needed to reach it from an
//! empty staging area, in dependency order. Each provider maps to the formats
//! it consumes; the first entry is its base format.

use crate::build::context::{Format, Provider};
use crate::steps::Step;

const RAW_STEPS: &[Step] = &[Step::BuildImage, Step::ExportFilesystem, Step::AssembleRaw];

const ISO_STEPS: &[Step] = &[
    Step::BuildImage,
    Step::ExportFilesystem,
    Step::AssembleRaw,
    Step::BuildIso,
    Step::Cleanup,
];

// qcow2 is converted from the ISO, not from a raw disk.
const QCOW2_STEPS: &[Step] = &[
    Step::BuildImage,
    Step::ExportFilesystem,
    Step::AssembleRaw,
    Step::BuildIso,
    Step::ConvertQcow2,
    Step::Cleanup,
];

/// Steps required to produce `format`.
pub fn format_steps(format: Format) -> &'static [Step] {
    match format {
        Format::Raw => RAW_STEPS,
        Format::Iso => ISO_STEPS,
        Format::Qcow2 => QCOW2_STEPS,
    }
}

/// Formats a provider consumes, base format first.
pub fn provider_formats(provider: Provider) -> &'static [Format] {
    match provider {
        Provider::Hyperkit => &[Format::Raw],
        Provider::Kvm => &[Format::Raw],
        Provider::Virtualbox => &[Format::Iso],
    }
}

/// The artifact tier every build for `provider` needs regardless of request.
pub fn base_format(provider: Provider) -> Format {
    provider_formats(provider)[0]
}
