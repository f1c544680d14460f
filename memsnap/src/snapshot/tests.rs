use super::*;
use crate::memory::VariableScope;
use crate::value::{AliasValue, Scalar, Value, ValueKind, WarningCause};
use memsnap_cfg::MemoryPath;

fn snapshot() -> Snapshot {
    Snapshot::new(SnapshotConfig::default())
}

fn int(i: i64) -> Value {
    Value::Scalar(Scalar::Integer(i))
}

fn string(s: &str) -> Value {
    Value::Scalar(Scalar::String(Arc::from(s)))
}

fn entry<I: IntoIterator<Item = Value>>(values: I) -> MemoryEntry {
    values.into_iter().collect()
}

fn var(name: &str) -> MemoryPath {
    MemoryPath::local(name)
}

/// Run `f` in one transaction and commit it.
fn transaction<F>(snapshot: &mut Snapshot, f: F) -> bool
where
    F: FnOnce(&mut Snapshot) -> Result<(), MemoryError>,
{
    snapshot.start_transaction().unwrap();
    f(snapshot).unwrap();
    snapshot.commit_transaction().unwrap()
}

fn same_content(a: &Snapshot, b: &Snapshot) -> bool {
    a.structure() == b.structure() && a.data() == b.data()
}

/// `$x = 1`, `$y = &$x`, `$a = [1 => "s"]`, `$o->f = 2`
fn populated() -> Snapshot {
    let mut s = snapshot();
    transaction(&mut s, |s| {
        s.assign(&var("x"), MemoryEntry::from(int(1)), false)?;
        s.assign_alias(&var("y"), &var("x"))?;
        s.assign(&var("a").key(1), MemoryEntry::from(string("s")), false)?;
        s.assign(&var("o").field("f"), MemoryEntry::from(int(2)), false)
    });
    s
}

#[test]
fn transaction_protocol() {
    let mut s = snapshot();
    assert_eq!(s.state(), SnapshotState::Fresh);
    assert_eq!(
        s.assign(&var("x"), MemoryEntry::from(int(1)), false),
        Err(MemoryError::TransactionNotOpen)
    );
    assert_eq!(s.commit_transaction(), Err(MemoryError::TransactionNotOpen));
    s.start_transaction().unwrap();
    assert_eq!(s.start_transaction(), Err(MemoryError::TransactionAlreadyOpen));
    assert_eq!(s.freeze(), Err(MemoryError::FreezeDuringTransaction));
    s.assign(&var("x"), MemoryEntry::from(int(1)), false).unwrap();
    assert!(s.commit_transaction().unwrap());
    assert_eq!(s.state(), SnapshotState::Committed);
    assert_eq!(s.commit_count(), 1);
    assert!(!s.exists(&MemoryIndex::global("never")));
}

#[test]
fn failed_mutation_restores_content() {
    let mut s = populated();
    let before = s.clone();
    s.start_transaction().unwrap();
    s.assign(&var("x"), MemoryEntry::from(int(9)), false).unwrap();
    let missing = MemoryIndex::global("missing");
    assert_eq!(
        s.create_alias(MemoryIndex::global("x"), missing),
        Err(MemoryError::MissingIndex(missing))
    );
    assert_eq!(s.state(), SnapshotState::Committed);
    assert!(same_content(&s, &before));

    s.start_transaction().unwrap();
    let alias = Value::Alias(AliasValue {
        target: MemoryIndex::global("x"),
    });
    assert_eq!(
        s.assign(&var("z"), MemoryEntry::from(alias), false),
        Err(MemoryError::AliasAsData)
    );
    assert!(same_content(&s, &before));
}

#[test]
fn frozen_snapshots_reject_transactions() {
    let mut s = populated();
    s.freeze().unwrap();
    s.freeze().unwrap();
    assert!(s.is_frozen());
    assert_eq!(s.start_transaction(), Err(MemoryError::Frozen));
    assert_eq!(
        s.assign(&var("x"), MemoryEntry::new(), false),
        Err(MemoryError::Frozen)
    );
}

#[test]
fn has_changed_is_semantic() {
    let mut s = populated();
    let changed = transaction(&mut s, |s| {
        s.assign(&var("x"), MemoryEntry::from(int(1)), false)
    });
    assert!(!changed);
    assert!(!s.has_changed());
    assert!(transaction(&mut s, |s| {
        s.assign(&var("x"), MemoryEntry::from(int(2)), false)
    }));
}

#[test]
fn unique_paths_update_strongly() {
    let mut s = snapshot();
    transaction(&mut s, |s| {
        s.assign(&var("x"), MemoryEntry::from(int(1)), false)?;
        s.assign(&var("x"), MemoryEntry::from(int(2)), false)
    });
    assert_eq!(s.read_value(&var("x")), MemoryEntry::from(int(2)));
}

#[test]
fn unknown_keys_update_weakly() {
    let mut s = snapshot();
    transaction(&mut s, |s| {
        s.assign(&var("a").key(1), MemoryEntry::from(int(1)), false)?;
        s.assign(&var("a").key(2), MemoryEntry::from(int(2)), false)?;
        s.assign(&var("a").unknown_key(), MemoryEntry::from(int(3)), false)
    });
    assert_eq!(s.read_value(&var("a").key(1)), entry([int(1), int(3)]));
    assert_eq!(s.read_value(&var("a").key(2)), entry([int(2), int(3)]));
    // keys nobody wrote fall back to the unknown member
    assert_eq!(
        s.read_value(&var("a").key(7)),
        entry([Value::Undefined, int(3)])
    );
}

#[test]
fn may_aliases_update_weakly() {
    let mut s = snapshot();
    transaction(&mut s, |s| {
        s.assign(&var("x"), MemoryEntry::from(int(1)), false)?;
        s.assign(&var("z"), MemoryEntry::from(int(2)), false)?;
        s.assign_alias(&var("y"), &var("x"))?;
        s.assign_alias(&var("y"), &var("z"))?;
        s.assign(&var("y"), MemoryEntry::from(int(5)), true)
    });
    assert_eq!(s.read_value(&var("y")), MemoryEntry::from(int(5)));
    assert_eq!(s.read_value(&var("x")), entry([int(1), int(5)]));
    assert_eq!(s.read_value(&var("z")), entry([int(2), int(5)]));

    // `$y` itself is certainly written, only its possible aliases are not
    transaction(&mut s, |s| {
        s.assign(&var("y"), MemoryEntry::from(int(6)), false)
    });
    assert_eq!(s.read_value(&var("y")), MemoryEntry::from(int(6)));
    assert_eq!(s.read_value(&var("x")), entry([int(1), int(5), int(6)]));
}

#[test]
fn rebinding_an_alias_degrades_it() {
    let (x, y, z) = (
        MemoryIndex::global("x"),
        MemoryIndex::global("y"),
        MemoryIndex::global("z"),
    );
    let mut s = snapshot();
    transaction(&mut s, |s| {
        s.assign(&var("x"), MemoryEntry::from(int(1)), false)?;
        s.assign(&var("z"), MemoryEntry::from(int(2)), false)?;
        s.assign_alias(&var("y"), &var("x"))
    });
    assert!(s.must_alias(&y, &x));
    assert!(s.must_alias(&x, &y));

    // a must-alias writes through
    transaction(&mut s, |s| {
        s.assign(&var("y"), MemoryEntry::from(int(3)), false)
    });
    assert_eq!(s.read_value(&var("x")), MemoryEntry::from(int(3)));

    transaction(&mut s, |s| s.assign_alias(&var("y"), &var("z")));
    assert!(!s.must_alias(&y, &x));
    assert!(s.may_alias(&y, &x));
    assert!(s.may_alias(&x, &y));
    assert!(s.may_alias(&y, &z));
    assert!(s.may_alias(&z, &y));

    let aliases = s.aliases(&y).unwrap();
    assert!(aliases.must().is_disjoint(aliases.may()));
}

#[test]
fn create_alias_needs_both_indices() {
    let mut s = populated();
    let (x, a) = (MemoryIndex::global("x"), MemoryIndex::global("a"));
    transaction(&mut s, |s| s.create_alias(a, x));
    assert!(s.must_alias(&a, &x));
    assert!(s.must_alias(&x, &a));
}

#[test]
fn merge_is_idempotent() {
    let a = populated();
    let mut out = snapshot();
    transaction(&mut out, |s| s.extend(&[&a, &a]));
    assert!(same_content(&out, &a));
}

#[test]
fn merge_is_commutative_and_associative() {
    let a = populated();
    let mut b = snapshot();
    transaction(&mut b, |s| {
        s.assign(&var("x"), MemoryEntry::from(string("b")), false)?;
        s.assign(&var("a").key(2), MemoryEntry::from(int(2)), false)
    });
    let mut c = snapshot();
    transaction(&mut c, |s| {
        s.assign_alias(&var("y"), &var("w"))?;
        s.create_array(&var("a"))
    });

    let mut ab = snapshot();
    transaction(&mut ab, |s| s.extend(&[&a, &b]));
    let mut ba = snapshot();
    transaction(&mut ba, |s| s.extend(&[&b, &a]));
    assert!(same_content(&ab, &ba));

    let mut ab_c = snapshot();
    transaction(&mut ab_c, |s| s.extend(&[&ab, &c]));
    let mut bc = snapshot();
    transaction(&mut bc, |s| s.extend(&[&b, &c]));
    let mut a_bc = snapshot();
    transaction(&mut a_bc, |s| s.extend(&[&a, &bc]));
    assert!(same_content(&ab_c, &a_bc));
}

#[test]
fn undefined_survives_merge() {
    let a = populated();
    let b = snapshot();
    let mut out = snapshot();
    transaction(&mut out, |s| s.extend(&[&a, &b]));
    assert_eq!(
        out.read_value(&var("x")),
        entry([Value::Undefined, int(1)])
    );
    // the alias only exists on one side
    let (x, y) = (MemoryIndex::global("x"), MemoryIndex::global("y"));
    assert!(out.may_alias(&y, &x));
}

#[test]
fn extend_contract() {
    let caller = populated();
    let mut callee = snapshot();
    transaction(&mut callee, |s| s.extend_as_call(&caller));
    assert_eq!(callee.call_level(), 1);

    let mut out = snapshot();
    out.start_transaction().unwrap();
    assert_eq!(out.extend(&[]), Err(MemoryError::NoSources));
    out.start_transaction().unwrap();
    assert_eq!(
        out.extend(&[&caller, &callee]),
        Err(MemoryError::CallLevelMismatch {
            expected: 0,
            found: 1
        })
    );
}

#[test]
fn single_source_extend_shares_storage() {
    let a = populated();
    let mut out = snapshot();
    transaction(&mut out, |s| s.extend(&[&a]));
    assert!(Arc::ptr_eq(&out.data, &a.data));
    transaction(&mut out, |s| {
        s.assign(&var("x"), MemoryEntry::from(int(4)), false)
    });
    assert!(!Arc::ptr_eq(&out.data, &a.data));
    assert_eq!(a.read_value(&var("x")), MemoryEntry::from(int(1)));
}

#[test]
fn merge_into_unions_sources() {
    let a = populated();
    let mut b = snapshot();
    transaction(&mut b, |s| {
        s.assign(&var("x"), MemoryEntry::from(string("b")), false)
    });
    let x = MemoryIndex::global("x");
    let out_index = MemoryIndex::global("out");
    let mut out = snapshot();
    transaction(&mut out, |s| s.merge_into(out_index, &[(x, &a), (x, &b)]));
    assert_eq!(out.read_index(out_index), entry([int(1), string("b")]));

    let missing = MemoryIndex::global("nothing");
    transaction(&mut out, |s| s.merge_into(out_index, &[(x, &a), (missing, &b)]));
    assert_eq!(out.read_index(out_index), entry([Value::Undefined, int(1)]));
}

#[test]
fn widening_terminates() {
    let mut s = Snapshot::new(SnapshotConfig {
        widening_limit: Some(2),
        simplify_limit: None,
    });
    let mut changes = vec![];
    for k in 0..6 {
        let values = entry((0..=k).map(int));
        changes.push(transaction(&mut s, |s| s.assign(&var("x"), values, false)));
    }
    assert_eq!(changes, vec![true, true, true, false, false, false]);
    assert_eq!(
        s.read_value(&var("x")),
        MemoryEntry::from(Value::AnyOf(ValueKind::Integer))
    );
    assert!(s.statistics().get(StatisticKind::Widening) >= 1);
}

#[test]
fn simplification_collapses_large_entries() {
    let mut s = Snapshot::new(SnapshotConfig {
        widening_limit: None,
        simplify_limit: Some(2),
    });
    transaction(&mut s, |s| {
        s.assign(
            &var("x"),
            entry([int(1), int(2), string("a"), Value::Undefined]),
            false,
        )
    });
    assert_eq!(
        s.read_value(&var("x")),
        entry([
            Value::Undefined,
            Value::AnyOf(ValueKind::Integer),
            Value::AnyOf(ValueKind::String)
        ])
    );
    assert_eq!(s.statistics().get(StatisticKind::Simplification), 1);
}

#[test]
fn statistics_are_per_snapshot() {
    let a = populated();
    let counted = a.statistics();
    assert_eq!(counted.get(StatisticKind::StartTransaction), 1);
    assert_eq!(counted.get(StatisticKind::AssignAlias), 1);

    let mut out = snapshot();
    transaction(&mut out, |s| s.extend(&[&a]));
    assert_eq!(out.statistics().get(StatisticKind::Extend), 1);
    assert_eq!(out.statistics().get(StatisticKind::AssignAlias), 0);
    assert_eq!(a.statistics(), counted);

    let mut copy = a.statistics();
    copy.absorb(&out.statistics());
    assert_eq!(a.statistics(), counted);
}

#[test]
fn arrays_are_copied_by_value() {
    let mut s = snapshot();
    transaction(&mut s, |s| {
        s.create_array(&var("a"))?;
        s.assign(&var("a").key(1), MemoryEntry::from(int(1)), false)?;
        let a = s.read_value(&var("a"));
        s.assign(&var("b"), a, false)?;
        s.assign(&var("b").key(1), MemoryEntry::from(int(2)), false)?;
        let a = s.read_value(&var("a"));
        s.assign(&var("a").key(2), a, false)
    });
    assert_eq!(s.read_value(&var("a").key(1)), MemoryEntry::from(int(1)));
    assert_eq!(s.read_value(&var("b").key(1)), MemoryEntry::from(int(2)));
    // the copy was taken before `$a[2]` existed
    assert_eq!(s.read_value(&var("a").key(2).key(1)), MemoryEntry::from(int(1)));
    assert_eq!(
        s.read_value(&var("a").key(2).key(2)),
        MemoryEntry::undefined()
    );

    // overwriting an array with a scalar drops its members
    transaction(&mut s, |s| {
        s.assign(&var("b"), MemoryEntry::from(int(0)), false)
    });
    assert!(!s.exists(&MemoryIndex::global("b").key(1)));
}

#[test]
fn unknown_key_reads_are_summarised() {
    let mut s = snapshot();
    transaction(&mut s, |s| {
        s.create_array(&var("e"))?;
        s.assign(&var("a").key(1), MemoryEntry::from(int(1)), false)?;
        s.assign(&var("a").key(2), MemoryEntry::from(int(2)), false)
    });
    assert_eq!(
        s.read_value(&var("a").unknown_key()),
        MemoryEntry::from(Value::AnyOf(ValueKind::Integer))
    );
    assert_eq!(s.read_value(&var("e").unknown_key()), MemoryEntry::undefined());

    transaction(&mut s, |s| {
        s.assign(&var("a").key(3), MemoryEntry::from(string("s")), false)
    });
    assert_eq!(s.read_value(&var("a").unknown_key()), MemoryEntry::from(Value::Any));
    assert!(s.collect(&var("a").unknown_key()).unknown);
}

#[test]
fn objects_are_shared_by_reference() {
    let mut s = snapshot();
    transaction(&mut s, |s| {
        s.assign(&var("o").field("f"), MemoryEntry::from(int(1)), false)?;
        let o = s.read_value(&var("o"));
        s.assign(&var("p"), o, false)?;
        s.assign(&var("p").field("f"), MemoryEntry::from(int(2)), false)
    });
    assert_eq!(s.read_value(&var("o").field("f")), MemoryEntry::from(int(2)));
    assert_eq!(s.structure().objects().count(), 1);

    let object = {
        s.start_transaction().unwrap();
        let object = s
            .create_object("A", "site", vec![("g".to_string(), MemoryEntry::from(int(3)))])
            .unwrap();
        s.assign(&var("q"), MemoryEntry::from(Value::Object(object.clone())), false)
            .unwrap();
        s.commit_transaction().unwrap();
        object
    };
    assert_eq!(&*object.class, "A");
    assert_eq!(s.read_value(&var("q").field("g")), MemoryEntry::from(int(3)));
    assert_eq!(s.read_value(&var("q").field("h")), MemoryEntry::undefined());
}

#[test]
fn unset_removes_or_weakens() {
    let mut s = snapshot();
    transaction(&mut s, |s| {
        s.assign(&var("x"), MemoryEntry::from(int(1)), false)?;
        s.assign(&var("a").key(1), MemoryEntry::from(int(1)), false)?;
        s.unset(&var("x"))?;
        s.unset(&var("a").unknown_key())
    });
    assert!(!s.exists(&MemoryIndex::global("x")));
    assert_eq!(s.read_value(&var("x")), MemoryEntry::undefined());
    assert_eq!(
        s.read_value(&var("a").key(1)),
        entry([Value::Undefined, int(1)])
    );
}

#[test]
fn calls_push_and_pop_frames() {
    let caller = populated();
    let mut callee = snapshot();
    transaction(&mut callee, |s| {
        s.extend_as_call(&caller)?;
        s.assign(&var("t"), MemoryEntry::from(int(1)), false)?;
        s.assign(&MemoryPath::global("x"), MemoryEntry::from(int(8)), false)?;
        s.assign_return(MemoryEntry::from(int(5)))
    });
    let local = MemoryIndex::variable("t", VariableScope::Local(1));
    assert!(callee.exists(&local));

    let mut after = snapshot();
    transaction(&mut after, |s| s.merge_with_call(Some(&var("r")), &[&callee]));
    assert_eq!(after.call_level(), 0);
    assert!(!after.exists(&local));
    assert!(!after.exists(&MemoryIndex::return_slot(1)));
    assert_eq!(after.read_value(&var("r")), MemoryEntry::from(int(5)));
    assert_eq!(after.read_value(&var("x")), MemoryEntry::from(int(8)));

    let mut top = snapshot();
    top.start_transaction().unwrap();
    assert_eq!(
        top.merge_with_call(None, &[&caller]),
        Err(MemoryError::NoCallFrame)
    );
}

#[test]
fn reports_land_in_diagnostics() {
    let mut s = snapshot();
    transaction(&mut s, |s| {
        let info = s
            .values()
            .info(WarningCause::UndefinedVariable, "main:0", "$x");
        s.report(info)
    });
    assert_eq!(s.warnings().len(), 1);
    assert_eq!(s.statistics().get(StatisticKind::Warning), 1);
    assert_eq!(s.statistics().get(StatisticKind::ValueCreated), 1);
    assert!(s.dump().to_string().contains("#diagnostics"));
}

/// `$x = 1; $y = &$x` on one side and `$x = 1` on the other, merged.
fn merged_with_may_alias() -> Snapshot {
    let mut aliased = snapshot();
    transaction(&mut aliased, |s| {
        s.assign(&var("x"), MemoryEntry::from(int(1)), false)?;
        s.assign_alias(&var("y"), &var("x"))
    });
    let mut plain = snapshot();
    transaction(&mut plain, |s| {
        s.assign(&var("x"), MemoryEntry::from(int(1)), false)
    });
    let mut out = snapshot();
    transaction(&mut out, |s| s.extend(&[&aliased, &plain]));
    out
}

#[test]
fn reads_ignore_may_aliases() {
    let s = merged_with_may_alias();
    let (x, y) = (MemoryIndex::global("x"), MemoryIndex::global("y"));
    assert!(s.may_alias(&x, &y));
    assert_eq!(s.read_value(&var("x")), MemoryEntry::from(int(1)));
    assert_eq!(s.read_value(&var("y")), entry([Value::Undefined, int(1)]));
}

#[test]
fn definite_writes_stay_strong_beside_may_aliases() {
    let mut s = merged_with_may_alias();
    transaction(&mut s, |s| {
        s.assign(&var("x"), MemoryEntry::from(int(2)), false)
    });
    assert_eq!(s.read_value(&var("x")), MemoryEntry::from(int(2)));
    assert_eq!(
        s.read_value(&var("y")),
        entry([Value::Undefined, int(1), int(2)])
    );

    transaction(&mut s, |s| {
        s.assign(&var("x").key(1), MemoryEntry::from(int(3)), false)
    });
    assert_eq!(s.read_value(&var("x").key(1)), MemoryEntry::from(int(3)));
    assert_eq!(
        s.read_value(&var("y").key(1)),
        entry([Value::Undefined, int(3)])
    );
}

#[test]
fn one_sided_alias_edges_are_rejected() {
    let (x, y) = (MemoryIndex::global("x"), MemoryIndex::global("y"));
    let mut s = snapshot();
    transaction(&mut s, |s| {
        s.assign(&var("x"), MemoryEntry::from(int(1)), false)?;
        s.assign(&var("y"), MemoryEntry::from(int(2)), false)
    });
    // only `$y` records the edge
    s.structure_mut()
        .definitions
        .get_mut(&y)
        .unwrap()
        .aliases
        .insert_may(x)
        .unwrap();
    s.start_transaction().unwrap();
    assert_eq!(s.create_alias(x, y), Err(MemoryError::ConflictingAlias(x)));
}
