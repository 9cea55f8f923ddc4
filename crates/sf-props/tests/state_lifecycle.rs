//! Integration tests for state block initialize/release.

use sf_core::{kgph, m3ph, mg_per_l};
use sf_model::{Model, OverrideStack, Scope};
use sf_props::{
    PropertyPackage, SoluteFlowPackage, SoluteSet, StateArgs, StateProvider,
    leach_solution_package,
};

#[test]
fn nested_holds_release_in_order() {
    let pkg = SoluteFlowPackage::new(SoluteSet::new(["Li", "Co"]).unwrap());
    let mut m = Model::new("fs");
    let unit = m.add_block(m.root(), "stage[1]").unwrap();
    let inlet = pkg.build_state(&mut m, unit, "properties_in").unwrap();
    let outlet = pkg.build_state(&mut m, unit, "properties_out").unwrap();

    let mut stack = OverrideStack::new();
    let args = StateArgs::new()
        .flow_vol(m3ph(30.0))
        .mass_flow("Li", kgph(3.0))
        .mass_flow("Co", kgph(6.0));
    let in_flags = inlet.initialize(&mut m, &mut stack, &args, true).unwrap();
    let out_flags = outlet.initialize(&mut m, &mut stack, &args, true).unwrap();
    assert_eq!(stack.len(), 6);

    outlet.release(&mut m, &mut stack, out_flags).unwrap();
    assert_eq!(stack.len(), 3);
    assert!(m.is_fixed(inlet.flow_vol()).unwrap());
    inlet.release(&mut m, &mut stack, in_flags).unwrap();
    assert!(stack.is_empty());

    // released states are free again: 2 * (3 state vars) unpinned
    assert_eq!(m.degrees_of_freedom(Scope::Block(unit)), 6);
}

#[test]
fn fixed_state_vars_are_not_overwritten() {
    let pkg = leach_solution_package().unwrap();
    let mut m = Model::new("fs");
    let root = m.root();
    let s = pkg.build_state(&mut m, root, "leach_in").unwrap();
    let water = s.conc_mass_comp("H2O").unwrap();
    m.fix(water, 5.0e5).unwrap();

    let mut stack = OverrideStack::new();
    let args = StateArgs::new().conc("H2O", mg_per_l(1.0e6));
    let flags = s.initialize(&mut m, &mut stack, &args, true).unwrap();
    assert_eq!(m.value(water).unwrap(), 5.0e5);
    // the already fixed water entry is not held again
    assert_eq!(flags.held, s.state_vars().len() - 1);
    s.release(&mut m, &mut stack, flags).unwrap();
    assert!(m.is_fixed(water).unwrap());
}
