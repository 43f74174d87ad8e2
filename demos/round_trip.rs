use rulewright::transform;
use rulewright::{
    Comparator, ContextAttribute, DefinitionRegistry, IntegerInput, RuleError, RulesetDefinition,
    ServiceMap, Value,
};

fn main() -> Result<(), RuleError> {
    let mut registry = DefinitionRegistry::new(ServiceMap::new());
    registry.register_input_impl("integer", |_| Box::new(IntegerInput::new()));
    registry.register_context_attribute_impl("identity", || {
        ContextAttribute::new(Comparator::number(), |object| {
            Ok(Value::Int(*object.downcast_ref::<i64>().ok_or("not an i64")?))
        })
    });
    registry.register_input("Integer", "integer", Vec::new());
    registry.register_context("Score", "int", "primitive")?;
    registry.register_context_attribute("Value", "Score", "identity", "Integer");
    registry.register_ruleset(
        "scoring",
        RulesetDefinition {
            contexts: vec!["Score".into()],
            ..RulesetDefinition::default()
        },
    );

    let ruleset = registry
        .ruleset_builder("scoring")?
        .start_rule("qualified")
        .start_condition_collection_all()
        .start_condition()
        .context_attribute("Score", "Value")?
        .operator("gte")
        .input_value(100_i64)
        .end()?
        .end()
        .add_then_rule("bonus")
        .end()?
        .start_rule("bonus")
        .start_condition_collection_any()
        .start_condition()
        .context_attribute("Score", "Value")?
        .operator("gt")
        .input_value(500_i64)
        .end()?
        .end()
        .end()?
        .build()?;

    // Flatten to the plain-data form and print it as JSON, the way a
    // persistence layer would store it.
    let data = transform::to_data(&ruleset);
    println!("{}", serde_json::to_string_pretty(&data).expect("serializable"));

    // Reconstruct and confirm the structures agree.
    let rebuilt = transform::from_data(&registry, &data)?;
    assert_eq!(transform::to_data(&rebuilt), data);
    println!("round-trip ok: {rebuilt}");
    Ok(())
}
