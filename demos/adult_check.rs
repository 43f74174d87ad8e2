use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use rulewright::{
    validate, BackingObject, Comparator, ContextAttribute, DefinitionRegistry, IntegerInput,
    RuleError, RulesetDefinition, ServiceAction, ServiceMap, Value,
};

struct User {
    name: &'static str,
    age: i64,
}

#[derive(Default)]
struct Moderation {
    bans: AtomicUsize,
}

fn main() -> Result<(), RuleError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let moderation = Arc::new(Moderation::default());

    // Register implementations and definitions.
    let resolver = ServiceMap::new().with("moderation", moderation.clone());
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
                .downcast_ref::<Moderation>()
                .ok_or("expected the Moderation service")?;
            moderation.bans.fetch_add(1, Ordering::SeqCst);
            println!("  -> Ban performed");
            Ok(())
        })
    });

    registry.register_input("Integer", "integer", Vec::new());
    registry.register_context("User", "User", "object")?;
    registry.register_context_attribute("Age", "User", "user_age", "Integer");
    registry.register_service_action("Ban", "moderation", "ban_user", "Integer");
    registry.register_ruleset(
        "access",
        RulesetDefinition {
            contexts: vec!["User".into()],
            ..RulesetDefinition::default()
        },
    );

    // Author the ruleset: ban adults on sight. Questionable policy, simple
    // demo.
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
        .start_then_action()
        .service_action("Ban")?
        .end()?
        .end()?
        .build()?;

    validate::validate(&ruleset)?;
    println!("{ruleset}");

    for user in [
        User { name: "claire", age: 20 },
        User { name: "sam", age: 10 },
    ] {
        println!("evaluating {} (age {})", user.name, user.age);
        let mut values: HashMap<String, BackingObject> = HashMap::new();
        values.insert("User".to_owned(), Arc::new(user));
        let result = ruleset.evaluate(values)?;
        println!("  result: {result}");
    }

    println!("total bans: {}", moderation.bans.load(Ordering::SeqCst));
    Ok(())
}
