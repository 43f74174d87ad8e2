use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use rulewright::{
    validate, BackingObject, BuildError, Comparator, ContextAttribute, DefinitionRegistry,
    EvaluateError, IntegerInput, RuleError, RulesetDefinition, ServiceAction, ServiceMap, Value,
};

struct User {
    age: i64,
}

#[derive(Default)]
struct BanService {
    bans: AtomicUsize,
}

/// Registry for the access-control scenario: a `User` context with a
/// numeric `Age` attribute, and a service-bound `Ban` action.
fn access_registry(ban_service: Arc<BanService>) -> DefinitionRegistry {
    let resolver = ServiceMap::new().with("moderation", ban_service);
    let mut registry = DefinitionRegistry::new(resolver);

    registry.register_input_impl("integer", |_| Box::new(IntegerInput::new()));
    registry.register_context_attribute_impl("user_age", || {
        ContextAttribute::new(Comparator::number(), |object| {
            let user = object.downcast_ref::<User>().ok_or("expected a User")?;
            Ok(Value::Int(user.age))
        })
    });
    registry.register_service_action_impl("ban_user", |service_name, service| {
        ServiceAction::new(service_name, service, |object, _| {
            let moderation = object
                .downcast_ref::<BanService>()
                .ok_or("expected the BanService")?;
            moderation.bans.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
    });

    registry.register_input("Integer", "integer", Vec::new());
    registry.register_context("User", "User", "object").unwrap();
    registry.register_context_attribute("Age", "User", "user_age", "Integer");
    registry.register_service_action("Ban", "moderation", "ban_user", "Integer");
    registry.register_ruleset(
        "access",
        RulesetDefinition {
            contexts: vec!["User".into()],
            ..RulesetDefinition::default()
        },
    );
    registry
}

fn user_values(age: i64) -> HashMap<String, BackingObject> {
    let mut values: HashMap<String, BackingObject> = HashMap::new();
    values.insert("User".to_owned(), Arc::new(User { age }));
    values
}

#[test]
fn adult_check_performs_ban_exactly_once() {
    let moderation = Arc::new(BanService::default());
    let registry = access_registry(moderation.clone());

    let ruleset = registry
        .ruleset_builder("access")
        .unwrap()
        .start_rule("AdultCheck")
        .start_condition_collection_all()
        .start_condition()
        .context_attribute("User", "Age")
        .unwrap()
        .operator("gte")
        .input_value(18_i64)
        .end()
        .unwrap()
        .end()
        .start_then_action()
        .service_action("Ban")
        .unwrap()
        .end()
        .unwrap()
        .end()
        .unwrap()
        .build()
        .unwrap();

    validate::validate(&ruleset).unwrap();

    assert!(ruleset.evaluate(user_values(20)).unwrap());
    assert_eq!(moderation.bans.load(Ordering::SeqCst), 1);
}

#[test]
fn adult_check_skips_ban_for_minors() {
    let moderation = Arc::new(BanService::default());
    let registry = access_registry(moderation.clone());

    let ruleset = registry
        .ruleset_builder("access")
        .unwrap()
        .start_rule("AdultCheck")
        .start_condition_collection_all()
        .start_condition()
        .context_attribute("User", "Age")
        .unwrap()
        .operator("gte")
        .input_value(18_i64)
        .end()
        .unwrap()
        .end()
        .start_then_action()
        .service_action("Ban")
        .unwrap()
        .end()
        .unwrap()
        .end()
        .unwrap()
        .build()
        .unwrap();

    assert!(!ruleset.evaluate(user_values(10)).unwrap());
    assert_eq!(moderation.bans.load(Ordering::SeqCst), 0);
}

#[test]
fn every_root_is_evaluated_even_after_a_false_one() {
    // Two roots: the first always false, the second fires an action. The
    // overall result ANDs to false but the second root's side effect still
    // happens.
    let moderation = Arc::new(BanService::default());
    let registry = access_registry(moderation.clone());

    let ruleset = registry
        .ruleset_builder("access")
        .unwrap()
        .start_rule("minor_gate")
        .start_condition_collection_all()
        .start_condition()
        .context_attribute("User", "Age")
        .unwrap()
        .operator("lt")
        .input_value(18_i64)
        .end()
        .unwrap()
        .end()
        .end()
        .unwrap()
        .start_rule("always_ban")
        .start_then_action()
        .service_action("Ban")
        .unwrap()
        .end()
        .unwrap()
        .end()
        .unwrap()
        .build()
        .unwrap();

    assert_eq!(ruleset.root_rule_names().len(), 2);
    assert!(!ruleset.evaluate(user_values(30)).unwrap());
    assert_eq!(moderation.bans.load(Ordering::SeqCst), 1);
}

#[test]
fn else_actions_fire_on_false() {
    let moderation = Arc::new(BanService::default());
    let registry = access_registry(moderation.clone());

    let ruleset = registry
        .ruleset_builder("access")
        .unwrap()
        .start_rule("minor_check")
        .start_condition_collection_all()
        .start_condition()
        .context_attribute("User", "Age")
        .unwrap()
        .operator("gte")
        .input_value(18_i64)
        .end()
        .unwrap()
        .end()
        .start_else_action()
        .service_action("Ban")
        .unwrap()
        .end()
        .unwrap()
        .end()
        .unwrap()
        .build()
        .unwrap();

    assert!(!ruleset.evaluate(user_values(10)).unwrap());
    assert_eq!(moderation.bans.load(Ordering::SeqCst), 1);

    assert!(ruleset.evaluate(user_values(40)).unwrap());
    assert_eq!(moderation.bans.load(Ordering::SeqCst), 1);
}

#[test]
fn unbound_context_fails_fast() {
    let moderation = Arc::new(BanService::default());
    let registry = access_registry(moderation);

    let ruleset = registry
        .ruleset_builder("access")
        .unwrap()
        .start_rule("AdultCheck")
        .start_condition_collection_all()
        .start_condition()
        .context_attribute("User", "Age")
        .unwrap()
        .operator("gte")
        .input_value(18_i64)
        .end()
        .unwrap()
        .end()
        .end()
        .unwrap()
        .build()
        .unwrap();

    // No value bound for the User context: evaluation must error, not
    // silently default.
    let err = ruleset.evaluate(HashMap::new()).unwrap_err();
    assert!(matches!(err, EvaluateError::UnboundContext { name } if name == "User"));
}

#[test]
fn failing_action_propagates_to_the_caller() {
    let resolver = ServiceMap::new().with("broken", Arc::new(()) as BackingObject);
    let mut registry = DefinitionRegistry::new(resolver);
    registry.register_input_impl("integer", |_| Box::new(IntegerInput::new()));
    registry.register_service_action_impl("explode", |service_name, service| {
        ServiceAction::new(service_name, service, |_, _| Err("disk on fire".into()))
    });
    registry.register_input("Integer", "integer", Vec::new());
    registry.register_service_action("Explode", "broken", "explode", "Integer");
    registry.register_ruleset("doom", RulesetDefinition::default());

    let ruleset = registry
        .ruleset_builder("doom")
        .unwrap()
        .start_rule("always")
        .start_then_action()
        .service_action("Explode")
        .unwrap()
        .end()
        .unwrap()
        .end()
        .unwrap()
        .build()
        .unwrap();

    let err = ruleset.evaluate(HashMap::new()).unwrap_err();
    assert!(matches!(err, EvaluateError::ActionFailed { name, .. } if name == "Explode"));
}

#[test]
fn unresolved_reference_names_the_dangling_rule() {
    let moderation = Arc::new(BanService::default());
    let registry = access_registry(moderation);

    let result = registry
        .ruleset_builder("access")
        .unwrap()
        .start_rule("A")
        .add_then_rule("B")
        .end()
        .unwrap()
        .build();

    match result {
        Err(BuildError::UnresolvedRuleReference { rule, reference }) => {
            assert_eq!(rule, "A");
            assert_eq!(reference, "B");
        }
        other => panic!("expected UnresolvedRuleReference, got {other:?}"),
    }
}

#[test]
fn unified_error_type_covers_the_pipeline() {
    fn run(registry: &DefinitionRegistry) -> Result<bool, RuleError> {
        let ruleset = registry
            .ruleset_builder("access")?
            .start_rule("AdultCheck")
            .start_condition_collection_all()
            .start_condition()
            .context_attribute("User", "Age")?
            .operator("gte")
            .input_value(18_i64)
            .end()?
            .end()
            .end()?
            .build()?;
        validate::validate(&ruleset)?;
        let mut values: HashMap<String, BackingObject> = HashMap::new();
        values.insert("User".to_owned(), Arc::new(User { age: 21 }));
        Ok(ruleset.evaluate(values)?)
    }

    let moderation = Arc::new(BanService::default());
    let registry = access_registry(moderation);
    assert!(run(&registry).unwrap());
}
