//! Portable lowerings for specials that have one.
//!
//! The asynchronous reset synchronizer fallback simply drives the domain
//! reset from the asynchronous source. It is only safe when the source pulse
//! lasts at least one clock cycle; platforms with reset primitives should
//! register an override.

use crate::error::LowerError;
use fhdl_ir::{
    bits_for, AsyncResetSynchronizer, BusSynchronizer, Design, Expr, Fragment, If, MultiReg, PulseSynchronizer,
    SignalAttr, SignalId, SignalSpec, Special, SpecialBody,
};
use num_bigint::BigInt;

pub(crate) const NO_RETIMING: &str = "no_retiming";

/// Lowers `special` without platform help.
pub(crate) fn lower(design: &mut Design, special: &Special) -> Result<Fragment, LowerError> {
    let kind = special.kind();
    let unsupported = |what: &str| LowerError::NotImplemented {
        kind,
        reason: format!("attempted to use {what}, but platform does not support them"),
    };
    match &special.body {
        SpecialBody::MultiReg(s) => multi_reg(design, s),
        SpecialBody::PulseSynchronizer(s) => pulse_synchronizer(design, s),
        SpecialBody::BusSynchronizer(s) => bus_synchronizer(design, s),
        SpecialBody::AsyncResetSynchronizer(s) => async_reset_synchronizer(s),
        SpecialBody::DifferentialInput(_) => Err(unsupported("a differential input")),
        SpecialBody::DifferentialOutput(_) => Err(unsupported("a differential output")),
        SpecialBody::DdrInput(_) => Err(unsupported("a DDR input")),
        SpecialBody::DdrOutput(_) => Err(unsupported("a DDR output")),
        SpecialBody::Tristate(_) | SpecialBody::Instance(_) | SpecialBody::Memory(_) => Err(LowerError::NotImplemented {
            kind,
            reason: "emitted directly, not lowered".to_string(),
        }),
    }
}

fn multi_reg(design: &mut Design, mr: &MultiReg) -> Result<Fragment, LowerError> {
    design.scope("multiregimpl", |d| -> Result<Fragment, LowerError> {
        let shape = d.shape_of(&mr.i)?;
        let mut stages = Vec::with_capacity(mr.n as usize);
        let mut src = mr.i.clone();
        for _ in 0..mr.n {
            let reg = d.create_signal(
                SignalSpec::new(shape)
                    .named("regs")
                    .reset(mr.reset.clone())
                    .reset_less()
                    .attr(SignalAttr::tag(NO_RETIMING)),
            )?;
            stages.push(reg.assign(src));
            src = reg.into();
        }
        let mut f = Fragment::new();
        f.add_sync(mr.odomain.clone(), stages);
        f.add_comb([mr.o.clone().assign(src)?]);
        Ok(f)
    })
}

fn pulse_synchronizer(design: &mut Design, ps: &PulseSynchronizer) -> Result<Fragment, LowerError> {
    design.scope("pulsesynchronizer", |d| -> Result<Fragment, LowerError> {
        let toggle_i = d.create_signal(SignalSpec::new(1).named("toggle_i").reset_less())?;
        let toggle_o = d.signal("toggle_o", 1)?;
        let toggle_o_r = d.create_signal(SignalSpec::new(1).named("toggle_o_r").reset_less())?;
        let mut f = Fragment::new();
        f.add_sync(
            ps.idomain.clone(),
            [If::new(ps.i.clone(), [toggle_i.assign(!toggle_i)]).into()],
        );
        f.add_special(d.special(MultiReg::new(toggle_i, toggle_o, ps.odomain.clone())));
        f.add_sync(ps.odomain.clone(), [toggle_o_r.assign(toggle_o)]);
        f.add_comb([ps.o.clone().assign(toggle_o ^ toggle_o_r)?]);
        Ok(f)
    })
}

fn bus_synchronizer(design: &mut Design, bs: &BusSynchronizer) -> Result<Fragment, LowerError> {
    let width = design.shape_of(&bs.i)?.width;
    let o_width = design.shape_of(&bs.o)?.width;
    if width != o_width {
        return Err(LowerError::InvalidSpecial {
            kind: fhdl_ir::SpecialKind::BusSynchronizer,
            reason: format!("input is {width} bits wide but output is {o_width}"),
        });
    }
    if width == 1 {
        let mut f = Fragment::new();
        f.add_special(design.special(MultiReg::new(bs.i.clone(), bs.o.clone(), bs.odomain.clone())));
        return Ok(f);
    }

    design.scope("bussynchronizer", |d| -> Result<Fragment, LowerError> {
        let (idomain, odomain) = (bs.idomain.clone(), bs.odomain.clone());
        let starter = d.create_signal(SignalSpec::new(1).named("starter").reset(1))?;
        let ping_i = d.signal("ping_i", 1)?;
        let ping_o = d.signal("ping_o", 1)?;
        let pong_i = d.signal("pong_i", 1)?;
        let pong_o = d.signal("pong_o", 1)?;
        let (timer, wait, done) = wait_timer(d, bs.timeout, &idomain)?;
        let ibuffer = d.create_signal(
            SignalSpec::new(width)
                .named("ibuffer")
                .reset_less()
                .attr(SignalAttr::tag(NO_RETIMING)),
        )?;
        let obuffer = d.signal("obuffer", width)?;

        let mut f = Fragment::new();
        f.add_sync(idomain.clone(), [starter.assign(0)]);
        f.add_special(d.special(PulseSynchronizer {
            i: ping_i.into(),
            o: ping_o.into(),
            idomain: idomain.clone(),
            odomain: odomain.clone(),
        }));
        f.add_special(d.special(PulseSynchronizer {
            i: pong_i.into(),
            o: pong_o.into(),
            idomain: odomain.clone(),
            odomain: idomain.clone(),
        }));
        f.add_comb([
            wait.assign(!ping_i),
            ping_i.assign(starter | pong_o | done),
            pong_i.assign(ping_i),
        ]);
        f.add_sync(
            idomain,
            [If::new(pong_o, [ibuffer.assign(bs.i.clone())]).into()],
        );
        f.add_special(d.special(MultiReg::new(ibuffer, obuffer, odomain.clone())));
        f.add_sync(
            odomain,
            [If::new(ping_o, [bs.o.clone().assign(obuffer)?]).into()],
        );
        f.merge(timer);
        Ok(f)
    })
}

/// Counts down from `cycles` while `wait` is high; `done` is high at zero.
fn wait_timer(design: &mut Design, cycles: u32, domain: &str) -> Result<(Fragment, SignalId, SignalId), LowerError> {
    design.scope("waittimer", |d| -> Result<(Fragment, SignalId, SignalId), LowerError> {
        let wait = d.signal("wait", 1)?;
        let done = d.signal("done", 1)?;
        let width = bits_for(&BigInt::from(cycles), false);
        let count = d.create_signal(SignalSpec::new(width).named("count").reset(cycles))?;
        let reload = d[count].reset.clone();
        let mut f = Fragment::new();
        f.add_comb([done.assign(Expr::from(count).cmp_eq(0))]);
        f.add_sync(
            domain,
            [If::new(wait, [If::new(!done, [count.assign(count - 1)]).into()])
                .otherwise([count.assign(reload)])
                .into()],
        );
        Ok((f, wait, done))
    })
}

fn async_reset_synchronizer(ars: &AsyncResetSynchronizer) -> Result<Fragment, LowerError> {
    let mut f = Fragment::new();
    f.add_comb([ars.reset.clone().assign(ars.async_reset.clone())?]);
    Ok(f)
}
