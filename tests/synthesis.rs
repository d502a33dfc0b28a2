//! End-to-end behaviour of the three synthesis recipes.

use std::sync::Arc;

use parking_lot::Mutex;
use typeforge::builtins::{self, names};
use typeforge::synth::TypeDescriptor;
use typeforge::{ContractEntry, DataType, ObjectRef, PropertyShape, Runtime, TypeHash, Value};

fn person_contract(runtime: &Runtime) -> TypeHash {
    runtime
        .register_contract(
            ContractEntry::interface("IPerson")
                .with_property(PropertyShape::read_write("Name", DataType::String))
                .with_property(PropertyShape::read_write("Age", DataType::I32))
                .with_property(PropertyShape::read_write(
                    "Tags",
                    DataType::collection(DataType::String),
                )),
        )
        .unwrap()
}

fn person_model(runtime: &Runtime) -> TypeHash {
    let contract = person_contract(runtime);
    runtime.build_model(contract).unwrap().type_hash()
}

fn tags(runtime: &Runtime, target: &ObjectRef) -> ObjectRef {
    runtime
        .get_property(target, "Tags")
        .unwrap()
        .as_object()
        .cloned()
        .unwrap()
}

fn strings(list: &ObjectRef) -> Vec<String> {
    list.list_items()
        .unwrap()
        .iter()
        .map(|v| v.as_str().unwrap().to_string())
        .collect()
}

fn add_all(runtime: &Runtime, list: &ObjectRef, items: &[&str]) {
    for item in items {
        runtime.call_method(list, "Add", vec![Value::from(*item)]).unwrap();
    }
}

fn record_notifications(target: &ObjectRef) -> Arc<Mutex<Vec<String>>> {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    target.subscribe_property_changed(move |name: &str| sink.lock().push(name.to_string()));
    seen
}

// =============================================================================
// Cache
// =============================================================================

#[test]
fn repeated_builds_return_the_same_class() {
    let runtime = Runtime::new().unwrap();
    let contract = person_contract(&runtime);

    let first = runtime.build_model(contract).unwrap();
    let second = runtime.build_model(contract).unwrap();
    assert!(Arc::ptr_eq(&first, &second));

    let vm = runtime.build_view_model(None, first.type_hash()).unwrap();
    let again = runtime.build_view_model(None, first.type_hash()).unwrap();
    assert!(Arc::ptr_eq(&vm, &again));
    assert_eq!(runtime.cache().len(), 2);
}

#[test]
fn a_different_base_still_gets_the_cached_class() {
    let runtime = Runtime::new().unwrap();
    let model = person_model(&runtime);
    let original = runtime.build_view_model(None, model).unwrap();

    let root = runtime.class(builtins::entity_view_model()).unwrap();
    let mut custom = TypeDescriptor::new("AuditedViewModel", Some(root));
    custom.set_abstract().unwrap();
    let custom = runtime.register_class(custom.finalize().unwrap()).unwrap();

    let cached = runtime
        .build_view_model(Some(custom.type_hash()), model)
        .unwrap();
    assert!(Arc::ptr_eq(&original, &cached));
    assert_eq!(
        cached.base().unwrap().type_hash(),
        builtins::entity_view_model()
    );
}

#[test]
fn recipes_do_not_share_cache_entries() {
    let runtime = Runtime::new().unwrap();
    let contract = person_contract(&runtime);
    let model = runtime.build_model(contract).unwrap();
    let self_vm = runtime.build_self_view_model(None, contract).unwrap();

    assert_eq!(model.name(), "IPersonModel");
    assert_eq!(self_vm.name(), "IPersonSelfViewModel");
    assert!(model.implements(contract));
    assert!(self_vm.implements(contract));
}

// =============================================================================
// Model
// =============================================================================

#[test]
fn model_properties_round_trip() {
    let runtime = Runtime::new().unwrap();
    let contract = person_contract(&runtime);
    let model = runtime.create_model(contract).unwrap();

    runtime.set_property(&model, "Name", "Grace").unwrap();
    runtime.set_property(&model, "Age", 85).unwrap();
    assert_eq!(runtime.get_property(&model, "Name").unwrap(), Value::from("Grace"));
    assert_eq!(runtime.get_property(&model, "Age").unwrap(), Value::I32(85));

    let list = tags(&runtime, &model);
    assert_eq!(list.class_name(), names::LIST);
    assert_eq!(list.list_len(), Some(0));
}

#[test]
fn model_instances_are_independent() {
    let runtime = Runtime::new().unwrap();
    let contract = person_contract(&runtime);
    let a = runtime.create_model(contract).unwrap();
    let b = runtime.create_model(contract).unwrap();

    runtime.set_property(&a, "Name", "A").unwrap();
    runtime.set_property(&b, "Name", "B").unwrap();
    add_all(&runtime, &tags(&runtime, &a), &["only-a"]);

    assert_eq!(runtime.get_property(&a, "Name").unwrap(), Value::from("A"));
    assert_eq!(runtime.get_property(&b, "Name").unwrap(), Value::from("B"));
    assert_eq!(tags(&runtime, &b).list_len(), Some(0));
}

#[test]
fn inherited_contract_members_are_synthesized() {
    let runtime = Runtime::new().unwrap();
    let named = runtime
        .register_contract(
            ContractEntry::interface("INamed")
                .with_property(PropertyShape::read_write("Name", DataType::String)),
        )
        .unwrap();
    let employee = runtime
        .register_contract(
            ContractEntry::interface("IEmployee")
                .with_base(named)
                .with_property(PropertyShape::read_write("Salary", DataType::F64)),
        )
        .unwrap();

    let class = runtime.build_model(employee).unwrap();
    assert!(class.implements(employee));
    assert!(class.implements(named));
    assert!(class.find_property("Name").is_some());
    assert!(class.find_property("Salary").is_some());
}

// =============================================================================
// Self ViewModel
// =============================================================================

#[test]
fn self_view_model_notifies_once_per_write() {
    let runtime = Runtime::new().unwrap();
    let contract = person_contract(&runtime);
    let vm = runtime.create_self_view_model(None, contract).unwrap();
    let seen = record_notifications(&vm);

    runtime.set_property(&vm, "Name", "Ada").unwrap();
    runtime.set_property(&vm, "Age", 36).unwrap();

    assert_eq!(*seen.lock(), vec!["Name".to_string(), "Age".to_string()]);
    let this = runtime.get_property(&vm, "Self").unwrap();
    assert!(Arc::ptr_eq(this.as_object().unwrap(), &vm));
    assert_eq!(tags(&runtime, &vm).class_name(), names::OBSERVABLE_COLLECTION);
}

// =============================================================================
// Dynamic ViewModel
// =============================================================================

#[test]
fn view_model_without_entity_uses_defaults() {
    let runtime = Runtime::new().unwrap();
    let model = person_model(&runtime);
    let vm = runtime.create_view_model(None, model).unwrap();

    assert_eq!(runtime.entity(&vm).unwrap(), Value::Null);
    assert_eq!(runtime.get_property(&vm, "Name").unwrap(), Value::Null);
    assert_eq!(runtime.get_property(&vm, "Age").unwrap(), Value::I32(0));
    assert_eq!(tags(&runtime, &vm).list_len(), Some(0));
}

#[test]
fn view_model_delegates_to_its_entity() {
    let runtime = Runtime::new().unwrap();
    let model = person_model(&runtime);
    let entity = runtime.instantiate(model).unwrap();
    runtime.set_property(&entity, "Name", "A").unwrap();

    let vm = runtime.create_view_model(None, model).unwrap();
    runtime.set_entity(&vm, &entity).unwrap();
    assert_eq!(runtime.get_property(&vm, "Name").unwrap(), Value::from("A"));

    let seen = record_notifications(&vm);
    runtime.set_property(&vm, "Name", "B").unwrap();

    assert_eq!(runtime.get_property(&entity, "Name").unwrap(), Value::from("B"));
    assert_eq!(*seen.lock(), vec!["Name".to_string()]);
}

#[test]
fn setting_the_entity_refreshes_every_property() {
    let runtime = Runtime::new().unwrap();
    let model = person_model(&runtime);
    let entity = runtime.instantiate(model).unwrap();
    let vm = runtime.create_view_model(None, model).unwrap();
    let seen = record_notifications(&vm);

    runtime.set_entity(&vm, &entity).unwrap();

    let seen = seen.lock();
    for name in ["Name", "Age", "Tags", "Entity"] {
        assert!(seen.iter().any(|n| n == name), "{name} was not raised");
    }
    assert_eq!(seen.last().map(String::as_str), Some("Entity"));
}

#[test]
fn collections_are_mirrored_both_ways() {
    let runtime = Runtime::new().unwrap();
    let model = person_model(&runtime);
    let entity = runtime.instantiate(model).unwrap();
    add_all(&runtime, &tags(&runtime, &entity), &["a", "b", "c"]);

    let vm = runtime.create_view_model(None, model).unwrap();
    runtime.set_entity(&vm, &entity).unwrap();
    let mirror = tags(&runtime, &vm);
    assert_eq!(mirror.class_name(), names::OBSERVABLE_COLLECTION);
    assert_eq!(strings(&mirror), ["a", "b", "c"]);

    runtime.call_method(&mirror, "Add", vec![Value::from("d")]).unwrap();
    assert_eq!(strings(&tags(&runtime, &entity)), ["a", "b", "c", "d"]);

    runtime
        .call_method(&mirror, "RemoveAt", vec![Value::I32(0)])
        .unwrap();
    runtime
        .call_method(&mirror, "set_Item", vec![Value::I32(0), Value::from("B")])
        .unwrap();
    assert_eq!(strings(&tags(&runtime, &entity)), ["B", "c", "d"]);

    runtime.call_method(&mirror, "Clear", vec![]).unwrap();
    assert_eq!(tags(&runtime, &entity).list_len(), Some(0));
}

#[test]
fn observable_entity_collections_are_mirrored() {
    let runtime = Runtime::new().unwrap();
    let contract = person_contract(&runtime);
    let model = runtime.build_model(contract).unwrap();
    let entity = runtime.create_self_view_model(None, contract).unwrap();
    assert_eq!(tags(&runtime, &entity).class_name(), names::OBSERVABLE_COLLECTION);
    add_all(&runtime, &tags(&runtime, &entity), &["a", "b", "c"]);

    // Wrapped through the model class and through the entity's own class.
    for wrapped in [model.type_hash(), entity.class().type_hash()] {
        let vm = runtime.create_view_model(None, wrapped).unwrap();
        runtime.set_entity(&vm, &entity).unwrap();
        assert_eq!(vm.field_by_name("__syncing_Tags"), Some(Value::Bool(false)));

        let mirror = tags(&runtime, &vm);
        assert_eq!(strings(&mirror), ["a", "b", "c"]);
        runtime.call_method(&mirror, "Add", vec![Value::from("d")]).unwrap();
        assert_eq!(strings(&tags(&runtime, &entity)), ["a", "b", "c", "d"]);
        runtime
            .call_method(&mirror, "RemoveAt", vec![Value::I32(3)])
            .unwrap();
        assert_eq!(strings(&tags(&runtime, &entity)), ["a", "b", "c"]);
    }
}

#[test]
fn collection_properties_record_their_instance_class() {
    let runtime = Runtime::new().unwrap();
    let contract = person_contract(&runtime);
    let model = runtime.build_model(contract).unwrap();
    let notifying = runtime.build_self_view_model(None, contract).unwrap();

    let tags_class = |class: &typeforge::ClassType| {
        class.find_property("Tags").and_then(|p| p.instance_class)
    };
    assert_eq!(tags_class(&model), Some(builtins::list()));
    assert_eq!(tags_class(&notifying), Some(builtins::observable_collection()));
    assert_eq!(model.find_property("Name").and_then(|p| p.instance_class), None);
}

#[test]
fn replacing_the_entity_replaces_the_mirror() {
    let runtime = Runtime::new().unwrap();
    let model = person_model(&runtime);
    let first = runtime.instantiate(model).unwrap();
    let second = runtime.instantiate(model).unwrap();
    add_all(&runtime, &tags(&runtime, &first), &["a", "b", "c"]);
    add_all(&runtime, &tags(&runtime, &second), &["x", "y"]);

    let vm = runtime.create_view_model(None, model).unwrap();
    runtime.set_entity(&vm, &first).unwrap();
    runtime.set_entity(&vm, &second).unwrap();

    assert_eq!(strings(&tags(&runtime, &vm)), ["x", "y"]);
    // Repopulating the mirror never writes back to either entity.
    assert_eq!(strings(&tags(&runtime, &first)), ["a", "b", "c"]);
    assert_eq!(strings(&tags(&runtime, &second)), ["x", "y"]);

    runtime.set_entity(&vm, Value::Null).unwrap();
    assert_eq!(tags(&runtime, &vm).list_len(), Some(0));
    assert_eq!(runtime.get_property(&vm, "Name").unwrap(), Value::Null);
}

#[test]
fn edit_copies_writable_properties_into_the_entity() {
    let runtime = Runtime::new().unwrap();
    let model = person_model(&runtime);
    let target = runtime.instantiate(model).unwrap();
    let source = runtime.instantiate(model).unwrap();
    runtime.set_property(&source, "Name", "Copied").unwrap();
    runtime.set_property(&source, "Age", 7).unwrap();

    let vm = runtime.create_view_model(None, model).unwrap();
    runtime.set_entity(&vm, &target).unwrap();
    runtime.edit(&vm, &source).unwrap();

    assert_eq!(runtime.get_property(&target, "Name").unwrap(), Value::from("Copied"));
    assert_eq!(runtime.get_property(&target, "Age").unwrap(), Value::I32(7));

    runtime.edit(&vm, Value::Null).unwrap();
    assert_eq!(runtime.get_property(&target, "Age").unwrap(), Value::I32(7));
}

#[test]
fn view_models_of_one_model_do_not_share_state() {
    let runtime = Runtime::new().unwrap();
    let model = person_model(&runtime);
    let a = runtime.instantiate(model).unwrap();
    let b = runtime.instantiate(model).unwrap();
    runtime.set_property(&a, "Name", "A").unwrap();
    runtime.set_property(&b, "Name", "B").unwrap();

    let vm_a = runtime.create_view_model(None, model).unwrap();
    let vm_b = runtime.create_view_model(None, model).unwrap();
    runtime.set_entity(&vm_a, &a).unwrap();
    runtime.set_entity(&vm_b, &b).unwrap();

    assert_eq!(runtime.get_property(&vm_a, "Name").unwrap(), Value::from("A"));
    assert_eq!(runtime.get_property(&vm_b, "Name").unwrap(), Value::from("B"));
}
