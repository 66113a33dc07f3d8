//! The elaboration entry point: fragment in, Verilog module out.

use crate::error::ConvertError;
use crate::module::ModuleWriter;
use crate::output::{ConvOutput, DataFiles};
use crate::specials::SpecialEmitters;
use fhdl_common::VERILOG_KEYWORDS;
use fhdl_config::{validate_options, ElabOptions};
use fhdl_ir::{visit, Design, Fragment, SignalId};
use fhdl_lower::{lower_fragment, resolve_clock_domains, SpecialOverrides};
use fhdl_namer::Namer;
use std::collections::BTreeSet;

/// Converts `fragment` into a Verilog module with the built-in special
/// lowerings and emitters.
///
/// `ios` become the module ports. Clock and reset signals of domains
/// created on the fly are added to them.
pub fn convert(
    design: &mut Design,
    fragment: Fragment,
    ios: impl IntoIterator<Item = SignalId>,
    options: &ElabOptions,
) -> Result<ConvOutput, ConvertError> {
    convert_with(
        design,
        fragment,
        ios,
        options,
        &SpecialOverrides::new(),
        &SpecialEmitters::builtin(),
    )
}

/// Like [`convert`], with platform-supplied special lowerings and emitters.
///
/// `overrides` replace the built-in lowering of their special kinds.
/// `emitters` print the specials left after lowering.
pub fn convert_with(
    design: &mut Design,
    fragment: Fragment,
    ios: impl IntoIterator<Item = SignalId>,
    options: &ElabOptions,
    overrides: &SpecialOverrides,
    emitters: &SpecialEmitters,
) -> Result<ConvOutput, ConvertError> {
    validate_options(options)?;
    let mut ios: BTreeSet<SignalId> = ios.into_iter().collect();

    let mut fragment = fragment.flatten();
    ios.extend(resolve_clock_domains(design, &mut fragment, options.create_clock_domains)?);
    lower_fragment(design, &mut fragment, &options.memory, overrides)?;

    let mut ports: Vec<SignalId> = ios.iter().copied().collect();
    ports.sort_by_key(|&id| design[id].sequence);
    for id in ports {
        if design[id].name_override.is_some() {
            continue;
        }
        if let Some(leaf) = design[id].backtrace.last().map(|entry| entry.name) {
            let name = design.resolve(leaf).to_string();
            design.get_mut(id).name_override = Some(name);
        }
    }

    let mut signals = visit::fragment_signals(&fragment);
    signals.extend(ios.iter().copied());
    let mut namer = Namer::build(design, signals.iter().copied(), VERILOG_KEYWORDS.iter().copied())?;
    tracing::debug!(module = %options.name, signals = namer.len(), ports = ios.len(), "named signals");

    let mut data_files = DataFiles::new();
    let source = ModuleWriter::new(design, &fragment, &ios, options).write(&mut namer, emitters, &mut data_files)?;
    let output = ConvOutput::new(source, namer, data_files);
    tracing::info!(
        module = %options.name,
        hash = %output.content_hash,
        data_files = output.data_files.len(),
        "converted module"
    );
    Ok(output)
}
