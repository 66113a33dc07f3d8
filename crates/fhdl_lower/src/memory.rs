//! Memory rewrites: full-width write enables, power-of-two splitting and
//! conversion to register arrays.
//!
//! These run after specials have been lowered, when port clocks are already
//! plain signals; generated synchronous logic goes to the port's domain.
//! Registers they create are reset-less.

use crate::error::LowerError;
use fhdl_ir::{
    Design, Expr, Fragment, If, Memory, MemoryPort, PortConfig, PortMode, Shape, SignalSpec, Special, SpecialBody,
    Statement,
};
use num_bigint::BigInt;
use num_traits::{One, Zero};

fn gcd(a: u32, b: u32) -> u32 {
    if b == 0 {
        a
    } else {
        gcd(b, a % b)
    }
}

/// Splits the memory specials of `fragment` with `rewrite`, keeping the rest.
fn rewrite_memories(
    design: &mut Design,
    fragment: &mut Fragment,
    mut rewrite: impl FnMut(&mut Design, &mut Fragment, Memory) -> Result<Option<Memory>, LowerError>,
) -> Result<usize, LowerError> {
    let mut rewritten = 0;
    let specials = std::mem::take(&mut fragment.specials);
    for special in specials {
        match special.body {
            SpecialBody::Memory(memory) => {
                let sequence = special.sequence;
                match rewrite(design, fragment, memory)? {
                    Some(memory) => fragment.specials.push(Special {
                        sequence,
                        body: SpecialBody::Memory(memory),
                    }),
                    None => rewritten += 1,
                }
            }
            body => fragment.specials.push(Special {
                sequence: special.sequence,
                body,
            }),
        }
    }
    Ok(rewritten)
}

/// Replaces memories with partial write enables by one memory per granule,
/// each written with a single enable. Returns the number of memories split.
pub fn full_memory_we(design: &mut Design, fragment: &mut Fragment) -> Result<usize, LowerError> {
    let n = rewrite_memories(design, fragment, |design, fragment, mem| {
        let width = mem.width;
        let mut grain = width;
        for port in &mem.ports {
            let pg = port.granularity(width);
            if width % pg != 0 {
                return Err(LowerError::Granularity {
                    memory: mem.name.clone(),
                    width,
                    granularity: pg,
                });
            }
            grain = gcd(grain, pg);
        }
        if grain == width {
            return Ok(Some(mem));
        }
        let mask = (BigInt::one() << grain) - 1;
        for i in 0..width / grain {
            let (lo, hi) = (i * grain, (i + 1) * grain);
            let init = mem.init.as_ref().map(|words| {
                words
                    .iter()
                    .map(|w| (Shape::unsigned(width).wrap(w) >> lo) & &mask)
                    .collect()
            });
            let mut ports = Vec::with_capacity(mem.ports.len());
            for port in &mem.ports {
                let pg = port.granularity(width);
                ports.push(MemoryPort {
                    adr: port.adr.clone(),
                    dat_r: port.dat_r.clone().slice(lo, hi)?,
                    we: port.we.clone().map(|we| we.bit(lo / pg)).transpose()?,
                    dat_w: port.dat_w.clone().map(|d| d.slice(lo, hi)).transpose()?,
                    re: port.re.clone(),
                    clock: port.clock.clone(),
                    domain: port.domain.clone(),
                    async_read: port.async_read,
                    we_granularity: 0,
                    mode: port.mode,
                });
            }
            let grain_mem = Memory {
                name: format!("{}_grain{i}", mem.name),
                width: grain,
                depth: mem.depth,
                init,
                ports,
            };
            fragment.specials.push(design.special(grain_mem));
        }
        Ok(None)
    })?;
    tracing::debug!(memories = n, "split memories into write granules");
    Ok(n)
}

/// Replaces memories whose depth is not a power of two by one memory per
/// set bit of the depth, largest first, plus address decoding. Returns the
/// number of memories split.
pub fn split_memory(design: &mut Design, fragment: &mut Fragment) -> Result<usize, LowerError> {
    let n = rewrite_memories(design, fragment, |design, fragment, mem| {
        if mem.depth == 0 || mem.depth.is_power_of_two() {
            return Ok(Some(mem));
        }
        let depths: Vec<u32> = (0..u32::BITS)
            .rev()
            .map(|b| 1u32 << b)
            .filter(|d| mem.depth & d != 0)
            .collect();
        let mut init = mem.init.clone().map(|w| w.into_iter());
        let mut parts: Vec<Memory> = depths
            .iter()
            .enumerate()
            .map(|(i, &depth)| {
                let mut part = Memory::new(format!("{}_part{i}", mem.name), mem.width, depth);
                if let Some(words) = init.as_mut() {
                    part.init = Some(words.by_ref().take(depth as usize).collect());
                }
                part
            })
            .collect();
        for port in &mem.ports {
            split_port(design, fragment, port, &mut parts)?;
        }
        for part in parts {
            fragment.specials.push(design.special(part));
        }
        Ok(None)
    })?;
    tracing::debug!(memories = n, "split memories into power-of-two parts");
    Ok(n)
}

fn split_port(
    design: &mut Design,
    fragment: &mut Fragment,
    port: &MemoryPort,
    parts: &mut [Memory],
) -> Result<(), LowerError> {
    let config = PortConfig {
        write_capable: port.we.is_some(),
        async_read: port.async_read,
        has_re: port.re.is_some(),
        we_granularity: port.we_granularity,
        mode: port.mode,
        domain: port.domain.clone(),
    };
    let sub = parts
        .iter_mut()
        .map(|part| design.memory_port(part, config.clone()))
        .collect::<Result<Vec<_>, _>>()?;

    let count = sub.len() as u64;
    let (sel, sel_r) = design.scope("splitmemory", |d| -> Result<_, LowerError> {
        let shape = Shape::for_max(count)?;
        let sel = d.create_signal(SignalSpec::new(shape).named("sel").reset(count - 1))?;
        let sel_r = d.create_signal(SignalSpec::new(shape).named("sel_r").reset(count - 1).reset_less())?;
        Ok((sel, sel_r))
    })?;

    let mut latch: Statement = sel_r.assign(sel);
    if let Some(re) = &port.re {
        latch = If::new(re.clone(), [latch]).into();
    }
    if port.async_read {
        fragment.comb.push(latch);
    } else {
        fragment.add_sync(port.domain.clone(), [latch]);
    }

    for (i, p) in sub.iter().enumerate().rev() {
        let adr_bits = design[p.adr].shape.width;
        fragment
            .comb
            .push(If::new(!port.adr.clone().bit(adr_bits)?, [sel.assign(i as i64)]).into());
    }
    fragment.comb.extend(sub.iter().map(|p| p.adr.assign(port.adr.clone())));
    fragment
        .comb
        .push(port.dat_r.clone().assign(Expr::array(sub.iter().map(|p| p.dat_r), sel_r)?)?);
    if let (Some(we), Some(dat_w)) = (&port.we, &port.dat_w) {
        let wes = sub.iter().filter_map(|p| p.we);
        fragment.comb.push(Expr::array(wes, sel)?.assign(we.clone())?);
        fragment
            .comb
            .extend(sub.iter().filter_map(|p| p.dat_w).map(|w| w.assign(dat_w.clone())));
    }
    if let Some(re) = &port.re {
        fragment
            .comb
            .extend(sub.iter().filter_map(|p| p.re).map(|r| r.assign(re.clone())));
    }
    Ok(())
}

/// Replaces every memory by an array of registers. Returns the number of
/// memories replaced.
pub fn memory_to_array(design: &mut Design, fragment: &mut Fragment) -> Result<usize, LowerError> {
    let n = rewrite_memories(design, fragment, |design, fragment, mem| {
        let storage = design.scope(&mem.name, |d| -> Result<Vec<_>, LowerError> {
            (0..mem.depth as usize)
                .map(|idx| {
                    let reset = mem
                        .init
                        .as_ref()
                        .and_then(|words| words.get(idx).cloned())
                        .unwrap_or_else(BigInt::zero);
                    d.create_signal(
                        SignalSpec::new(mem.width)
                            .named("mem_storage")
                            .reset(reset)
                            .reset_less(),
                    )
                    .map_err(LowerError::from)
                })
                .collect()
        })?;
        for port in &mem.ports {
            array_port(design, fragment, &mem, &storage, port)?;
        }
        Ok(None)
    })?;
    tracing::debug!(memories = n, "converted memories to register arrays");
    Ok(n)
}

fn array_port(
    design: &mut Design,
    fragment: &mut Fragment,
    mem: &Memory,
    storage: &[fhdl_ir::SignalId],
    port: &MemoryPort,
) -> Result<(), LowerError> {
    let word = |key: Expr| Expr::array(storage.iter().copied(), key);
    let mut sync: Vec<Statement> = Vec::new();

    if port.async_read {
        fragment.comb.push(port.dat_r.clone().assign(word(port.adr.clone())?)?);
    } else {
        let read = match (port.mode, &port.we) {
            (PortMode::WriteFirst, _) => {
                let adr_reg = design.scope(&mem.name, |d| {
                    d.signal_for(&port.adr, SignalSpec::new(1).named("adr_reg").reset_less())
                })?;
                fragment.comb.push(port.dat_r.clone().assign(word(adr_reg.into())?)?);
                adr_reg.assign(port.adr.clone())
            }
            (PortMode::NoChange, Some(we)) => If::new(
                !we.clone(),
                [port.dat_r.clone().assign(word(port.adr.clone())?)?],
            )
            .into(),
            _ => port.dat_r.clone().assign(word(port.adr.clone())?)?,
        };
        sync.push(match &port.re {
            Some(re) => If::new(re.clone(), [read]).into(),
            None => read,
        });
    }

    if let (Some(we), Some(dat_w)) = (&port.we, &port.dat_w) {
        let pg = port.granularity(mem.width);
        if pg == mem.width {
            sync.push(If::new(we.clone(), [word(port.adr.clone())?.assign(dat_w.clone())?]).into());
        } else {
            for i in 0..mem.width / pg {
                let (lo, hi) = (i * pg, (i + 1) * pg);
                let lanes = storage
                    .iter()
                    .map(|s| Expr::from(*s).slice(lo, hi))
                    .collect::<Result<Vec<_>, _>>()?;
                let target = Expr::array(lanes, port.adr.clone())?;
                sync.push(
                    If::new(
                        we.clone().bit(i)?,
                        [target.assign(dat_w.clone().slice(lo, hi)?)?],
                    )
                    .into(),
                );
            }
        }
    }
    if !sync.is_empty() {
        fragment.add_sync(port.domain.clone(), sync);
    }
    Ok(())
}
