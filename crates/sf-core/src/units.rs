// sf-core/src/units.rs

use uom::si::f64::{
    Length as UomLength, MassDensity as UomMassDensity, MassRate as UomMassRate,
    Ratio as UomRatio, Time as UomTime, VolumeRate as UomVolumeRate,
};

// Public canonical unit types (SI, f64)
pub type Length = UomLength;
pub type MassRate = UomMassRate;
/// Mass of solute per volume of solution.
pub type Concentration = UomMassDensity;
pub type Ratio = UomRatio;
pub type Time = UomTime;
pub type VolumeRate = UomVolumeRate;

const SECONDS_PER_HOUR: f64 = 3600.0;
const LITERS_PER_CUBIC_METER: f64 = 1000.0;
const MG_PER_L_PER_KG_PER_M3: f64 = 1000.0;

// The equation model is written in process units (m³/h, kg/h, kg/m³, mg/L).
// These helpers are the only place where those numbers meet SI quantities.

#[inline]
pub fn m3ph(v: f64) -> VolumeRate {
    use uom::si::volume_rate::cubic_meter_per_second;
    VolumeRate::new::<cubic_meter_per_second>(v / SECONDS_PER_HOUR)
}

#[inline]
pub fn to_m3ph(q: VolumeRate) -> f64 {
    use uom::si::volume_rate::cubic_meter_per_second;
    q.get::<cubic_meter_per_second>() * SECONDS_PER_HOUR
}

#[inline]
pub fn lph(v: f64) -> VolumeRate {
    m3ph(v / LITERS_PER_CUBIC_METER)
}

#[inline]
pub fn to_lph(q: VolumeRate) -> f64 {
    to_m3ph(q) * LITERS_PER_CUBIC_METER
}

#[inline]
pub fn kgph(v: f64) -> MassRate {
    use uom::si::mass_rate::kilogram_per_second;
    MassRate::new::<kilogram_per_second>(v / SECONDS_PER_HOUR)
}

#[inline]
pub fn to_kgph(m: MassRate) -> f64 {
    use uom::si::mass_rate::kilogram_per_second;
    m.get::<kilogram_per_second>() * SECONDS_PER_HOUR
}

#[inline]
pub fn kg_per_m3(v: f64) -> Concentration {
    use uom::si::mass_density::kilogram_per_cubic_meter;
    Concentration::new::<kilogram_per_cubic_meter>(v)
}

#[inline]
pub fn to_kg_per_m3(c: Concentration) -> f64 {
    use uom::si::mass_density::kilogram_per_cubic_meter;
    c.get::<kilogram_per_cubic_meter>()
}

#[inline]
pub fn mg_per_l(v: f64) -> Concentration {
    kg_per_m3(v / MG_PER_L_PER_KG_PER_M3)
}

#[inline]
pub fn to_mg_per_l(c: Concentration) -> f64 {
    to_kg_per_m3(c) * MG_PER_L_PER_KG_PER_M3
}

#[inline]
pub fn m(v: f64) -> Length {
    use uom::si::length::meter;
    Length::new::<meter>(v)
}

#[inline]
pub fn to_m(l: Length) -> f64 {
    use uom::si::length::meter;
    l.get::<meter>()
}

#[inline]
pub fn hours(v: f64) -> Time {
    use uom::si::time::second;
    Time::new::<second>(v * SECONDS_PER_HOUR)
}

#[inline]
pub fn unitless(v: f64) -> Ratio {
    use uom::si::ratio::ratio;
    Ratio::new::<ratio>(v)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() <= 1e-9 * a.abs().max(b.abs()).max(1.0)
    }

    #[test]
    fn process_units_round_trip() {
        assert!(close(to_m3ph(m3ph(100.0)), 100.0));
        assert!(close(to_lph(lph(250.0)), 250.0));
        assert!(close(to_kgph(kgph(1700.0)), 1700.0));
        assert!(close(to_mg_per_l(mg_per_l(1e6)), 1e6));
        assert!(close(to_m(m(12.5)), 12.5));
    }

    #[test]
    fn concentration_scales() {
        // 1 kg/m³ is 1000 mg/L
        assert!(close(to_mg_per_l(kg_per_m3(1.0)), 1000.0));
        // 1 m³/h is 1000 L/h
        assert!(close(to_lph(m3ph(1.0)), 1000.0));
    }

    #[test]
    fn constructors_smoke() {
        let _t = hours(1.0);
        let _r = unitless(0.5);
    }
}
