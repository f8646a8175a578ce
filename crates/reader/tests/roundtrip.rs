//! Dump/parse round-trips between the reader and the automaton printer.

use rabbet_automata::RabinAutomaton;
use rabbet_bitset::DenseBitSet;
use rabbet_reader::parse_automaton;

fn set_of(capacity: u32, members: &[u32]) -> DenseBitSet {
    let mut set = DenseBitSet::with_capacity(capacity);
    for &m in members {
        set.insert(m);
    }
    set
}

fn build_sample() -> RabinAutomaton {
    let mut automaton = RabinAutomaton::new(4);
    automaton.set_start(2);
    automaton.add_transition(0, 1, 2);
    automaton.add_transition(0, 3, 3);
    automaton.add_transition(2, 0, 0);
    automaton.add_transition(3, 3, 3);
    automaton.add_acceptance(set_of(4, &[1]), set_of(4, &[0, 3]));
    automaton.add_acceptance(set_of(4, &[]), set_of(4, &[2]));
    automaton
}

#[test]
fn dump_then_parse_is_identity() {
    let original = build_sample();
    let dump = original.to_string();
    let reparsed = parse_automaton(&dump).expect("own dump parses");

    assert_eq!(reparsed.states(), original.states());
    assert_eq!(reparsed.start(), original.start());
    for q in 0..original.states() {
        assert_eq!(reparsed.transitions(q), original.transitions(q));
    }
    assert_eq!(reparsed.conditions(), original.conditions());

    // And the dump of the reparse is byte-identical.
    assert_eq!(reparsed.to_string(), dump);
}

#[test]
fn verdict_survives_a_dump_parse_cycle() {
    // Nonempty: 3 loops on itself and is in a u set.
    let mut automaton = RabinAutomaton::new(4);
    automaton.set_start(3);
    automaton.add_transition(3, 3, 3);
    automaton.add_acceptance(set_of(4, &[]), set_of(4, &[3]));

    let direct = automaton.find_run(1).unwrap().is_some();
    let reparsed = parse_automaton(&automaton.to_string()).expect("parses");
    let through_text = reparsed.find_run(1).unwrap().is_some();
    assert!(direct);
    assert_eq!(direct, through_text);

    // Empty: the only cycle hits l.
    let mut automaton = RabinAutomaton::new(2);
    automaton.add_transition(0, 0, 0);
    automaton.add_acceptance(set_of(2, &[0]), set_of(2, &[0, 1]));

    let direct = automaton.find_run(1).unwrap().is_some();
    let reparsed = parse_automaton(&automaton.to_string()).expect("parses");
    let through_text = reparsed.find_run(1).unwrap().is_some();
    assert!(!direct);
    assert_eq!(direct, through_text);
}

#[test]
fn logic_program_of_parsed_automaton_matches() {
    let original = build_sample();
    let reparsed = parse_automaton(&original.to_string()).expect("parses");
    assert_eq!(
        reparsed.logic_program().to_string(),
        original.logic_program().to_string()
    );
}
