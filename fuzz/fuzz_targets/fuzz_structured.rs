#![no_main]

use libfuzzer_sys::fuzz_target;
use arbitrary::Arbitrary;
use bundle_sync::{apply, diff, SyncFilter, SyncMode, SyncPlan};
use serde_json::{json, Value};

#[derive(Arbitrary, Debug)]
struct FuzzSync {
    source: FuzzValue,
    target: FuzzValue,
    all_mode: bool,
    categories: Vec<u8>,
    addons: Vec<u8>,
}

#[derive(Arbitrary, Debug)]
enum FuzzValue {
    Null,
    Bool(bool),
    Number(i32),
    String(String),
    Array(Vec<FuzzValue>),
    Object(Vec<(u8, FuzzValue)>),
}

// Keys come from a small alphabet so both trees share positions often.
fn key(k: u8) -> String {
    match k % 5 {
        0 => "addons".to_string(),
        1 => "settings".to_string(),
        n => format!("k{}", n),
    }
}

impl FuzzValue {
    fn to_json(&self) -> Value {
        match self {
            FuzzValue::Null => Value::Null,
            FuzzValue::Bool(b) => Value::Bool(*b),
            FuzzValue::Number(n) => json!(n),
            FuzzValue::String(s) => Value::String(s.clone()),
            FuzzValue::Array(arr) => Value::Array(arr.iter().map(|v| v.to_json()).collect()),
            FuzzValue::Object(obj) => {
                let map: serde_json::Map<String, Value> =
                    obj.iter().map(|(k, v)| (key(*k), v.to_json())).collect();
                Value::Object(map)
            }
        }
    }
}

fuzz_target!(|input: FuzzSync| {
    let source = input.source.to_json();
    let target = input.target.to_json();
    let mode = if input.all_mode { SyncMode::All } else { SyncMode::DiffOnly };

    // Unfiltered all-mode sync reproduces the source exactly
    let (mirrored, _) = apply(&source, &target, SyncMode::All, &SyncFilter::new());
    assert_eq!(mirrored, source);

    // Every key of either tree shows up in the record
    let record = diff(&target, &source, 0);
    for tree in [&source, &target] {
        if let Some(map) = tree.as_object() {
            for k in map.keys() {
                assert!(record.children.iter().any(|c| c.key() == Some(k.as_str())));
            }
        }
    }

    let mut filter = SyncFilter::new();
    if !input.categories.is_empty() {
        filter = filter.with_categories(input.categories.iter().map(|k| key(*k)));
    }
    if !input.addons.is_empty() {
        filter = filter.with_addon_names(input.addons.iter().map(|k| key(*k)));
    }

    let plan = SyncPlan::build(&source, &target, mode, &filter);
    let (synced, count) = apply(&source, &target, mode, &filter);
    assert_eq!(count, plan.change_count());

    // A second pass finds nothing left to do
    let (again, again_count) = apply(&source, &synced, mode, &filter);
    assert_eq!(again_count, 0);
    assert_eq!(again, synced);
});
