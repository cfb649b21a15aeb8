#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use crate::checker::{CONNECT_DIRECTION, SchemaChecker, format_result};
    use crate::config::CheckerConfig;
    use crate::diff::{DiffKind, SchemaDiff};
    use crate::merge::MergeError;
    use crate::normalize::normalize;
    use crate::primitive::{AllOfMerge, MergePrimitive};
    use crate::subset::SubsetResult;
    use proptest::prelude::*;
    use serde_json::{Value, json};
    use std::cmp::Ordering;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};

    fn checker() -> SchemaChecker {
        SchemaChecker::new()
    }

    /// Follows a diff path such as `.properties.age.minimum` or `.items[1].type`.
    fn lookup<'v>(schema: &'v Value, path: &str) -> Option<&'v Value> {
        let mut current = schema;
        for segment in path.split('.').filter(|s| !s.is_empty()) {
            let (name, indexes) = match segment.find('[') {
                Some(at) => (&segment[..at], &segment[at..]),
                None => (segment, ""),
            };
            current = current.get(name)?;
            for index in indexes.split(['[', ']']).filter(|s| !s.is_empty()) {
                current = current.get(index.parse::<usize>().ok()?)?;
            }
        }
        Some(current)
    }

    #[test]
    fn test_reflexivity() {
        let checker = checker();
        for schema in [
            json!({}),
            json!(true),
            json!(false),
            json!({"type": "string", "pattern": "^[a-z]+$"}),
            json!({"anyOf": [{"type": "string"}, {"type": "integer", "minimum": 3}]}),
            json!({"type": "object", "properties": {"a": {"const": 1}}, "required": ["a"]}),
            json!({"not": {"const": "deleted"}}),
        ] {
            assert!(checker.is_subset(&schema, &schema), "{schema}");
        }
    }

    #[test]
    fn test_mutual_subsets_are_equal() {
        let checker = checker();
        let pairs = [
            (json!({"enum": ["only"]}), json!({"const": "only"})),
            (
                json!({"type": ["string", "integer"]}),
                json!({"type": ["integer", "string"]}),
            ),
            (
                json!({"type": "integer", "title": "count"}),
                json!({"type": "integer"}),
            ),
        ];
        for (a, b) in pairs {
            assert!(checker.is_subset(&a, &b), "{a} <= {b}");
            assert!(checker.is_subset(&b, &a), "{b} <= {a}");
            assert!(checker.is_equal(&normalize(&a), &normalize(&b)));
        }
    }

    #[test]
    fn test_empty_and_metadata_only_schemas() {
        let checker = checker();
        assert!(!checker.is_subset(&json!({}), &json!({"type": "string"})));
        assert!(checker.is_subset(&json!({"type": "string"}), &json!({})));
        assert!(checker.is_subset(
            &json!({"title": "Anything", "description": "no constraints"}),
            &json!({})
        ));
        assert!(checker.is_subset(&json!({"type": "string"}), &json!(true)));
        assert!(checker.is_subset(&json!(false), &json!({"type": "string"})));
    }

    #[test]
    fn test_const_conflict() {
        let checker = checker();
        assert!(!checker.is_subset(&json!({"const": "a"}), &json!({"const": "b"})));
        assert_eq!(
            checker.intersect(&json!({"const": "a"}), &json!({"const": "b"})),
            None
        );
    }

    #[test]
    fn test_const_against_enum() {
        let checker = checker();
        assert!(checker.is_subset(&json!({"const": "x"}), &json!({"enum": ["x", "y"]})));
        assert!(!checker.is_subset(&json!({"const": "x"}), &json!({"enum": ["y", "z"]})));
    }

    #[test]
    fn test_enum_containment_and_intersection() {
        let checker = checker();
        assert!(checker.is_subset(&json!({"enum": [1, 2]}), &json!({"enum": [1, 2, 3]})));
        assert!(!checker.is_subset(&json!({"enum": [1, 2, 3]}), &json!({"enum": [1, 2]})));
        assert_eq!(
            checker.intersect(&json!({"enum": [1, 2, 3]}), &json!({"enum": [2, 3, 4]})),
            Some(json!({"enum": [2, 3]}))
        );
    }

    #[test]
    fn test_null_survives_enum_intersection() {
        let checker = checker();
        assert!(checker.is_subset(
            &json!({"enum": ["a", null]}),
            &json!({"enum": ["a", "b", null]})
        ));
        assert_eq!(checker.engine().compare(&Value::Null, &Value::Null), Ordering::Equal);
    }

    #[test]
    fn test_singleton_enum_matches_const() {
        let checker = checker();
        assert!(checker.is_subset(&json!({"enum": ["only"]}), &json!({"const": "only"})));
        assert!(checker.is_subset(&json!({"const": "only"}), &json!({"enum": ["only"]})));
    }

    #[test]
    fn test_deep_const_conflicts() {
        let checker = checker();
        let conflicting = [
            (
                json!({"items": {"const": "a"}}),
                json!({"items": {"const": "b"}}),
            ),
            (
                json!({"additionalProperties": {"const": 1}}),
                json!({"additionalProperties": {"const": 2}}),
            ),
            (
                json!({"patternProperties": {"^x-": {"const": true}}}),
                json!({"patternProperties": {"^x-": {"const": false}}}),
            ),
            (
                json!({"items": [{"type": "string"}, {"const": "a"}]}),
                json!({"items": [{"type": "string"}, {"const": "b"}]}),
            ),
        ];
        for (a, b) in conflicting {
            assert_eq!(checker.intersect(&a, &b), None, "{a} & {b}");
            assert!(!checker.is_subset(&a, &b));
        }

        let separate = checker.intersect(
            &json!({"patternProperties": {"^x-": {"const": 1}}}),
            &json!({"patternProperties": {"^y-": {"const": 2}}}),
        );
        assert!(separate.is_some());
    }

    #[test]
    fn test_pattern_sampling() {
        let checker = checker();
        assert_eq!(checker.is_pattern_subset("^[a-z]{3}$", "^[a-z]+$"), Some(true));
        assert_eq!(checker.is_pattern_subset("^[a-z]+$", "^[0-9]+$"), Some(false));
        assert_eq!(checker.is_pattern_subset("^[a-z]+$", "^[a-z]{3}$"), Some(false));
        assert_eq!(checker.is_pattern_subset("^[a-z", "^[a-z]+$"), None);
        assert_eq!(checker.is_pattern_subset("^[a-z]+$", "(unclosed"), None);
        assert_eq!(checker.are_patterns_equivalent("^a+$", "^a+$"), Some(true));
    }

    #[test]
    fn test_pattern_keywords_in_schemas() {
        let checker = checker();
        assert!(checker.is_subset(
            &json!({"type": "string", "pattern": "^[a-z]{3}$"}),
            &json!({"type": "string", "pattern": "^[a-z]+$"})
        ));
        let result = checker.check(
            &json!({"type": "string", "pattern": "^[a-z]+$"}),
            &json!({"type": "string", "pattern": "^[0-9]+$"}),
        );
        assert!(!result.is_subset);
        assert_eq!(result.diffs[0].path, ".pattern");
    }

    #[test]
    fn test_not_reasoning() {
        let checker = checker();
        assert!(checker.is_subset(
            &json!({"type": "string", "const": "active"}),
            &json!({"not": {"const": "deleted"}})
        ));
        assert!(!checker.is_subset(
            &json!({"const": "deleted"}),
            &json!({"not": {"const": "deleted"}})
        ));
        assert!(checker.is_subset(
            &json!({"type": "integer"}),
            &json!({"not": {"type": "string"}})
        ));
    }

    #[test]
    fn test_format() {
        let checker = checker();
        assert!(checker.is_subset(
            &json!({"type": "string", "format": "email"}),
            &json!({"type": "string"})
        ));
        assert_eq!(
            checker.intersect(
                &json!({"type": "string", "format": "email"}),
                &json!({"type": "string", "format": "ipv4"})
            ),
            None
        );
        assert!(!checker.is_subset(
            &json!({"type": "string"}),
            &json!({"type": "string", "format": "email"})
        ));
    }

    fn account_schema() -> Value {
        json!({
            "type": "object",
            "properties": {"accountType": {"type": "string"}},
            "if": {"properties": {"accountType": {"const": "business"}}},
            "then": {"required": ["companyName"]},
            "else": {"required": ["firstName"]}
        })
    }

    #[test]
    fn test_conditional_resolution() {
        let checker = checker();
        let result =
            checker.resolve_conditions(&account_schema(), &json!({"accountType": "business"}));
        let resolved = result.resolved.as_object().unwrap();
        assert!(!resolved.contains_key("if"));
        assert!(!resolved.contains_key("then"));
        assert!(!resolved.contains_key("else"));
        assert!(
            resolved["required"]
                .as_array()
                .unwrap()
                .contains(&json!("companyName"))
        );
        assert_eq!(result.discriminant["accountType"], json!("business"));
    }

    #[test]
    fn test_check_resolved_agrees_with_direct_check() {
        let checker = checker();
        let consumer = json!({
            "type": "object",
            "properties": {"accountType": {"type": "string"}},
            "if": {"properties": {"accountType": {"const": "business"}}},
            "then": {"required": ["companyName"]}
        });
        for data in [
            json!({"accountType": "business"}),
            json!({"accountType": "personal"}),
        ] {
            let combined = checker.check_resolved(&account_schema(), &consumer, &data, None);
            let sub = checker.resolve_conditions(&account_schema(), &data).resolved;
            let sup = checker.resolve_conditions(&consumer, &data).resolved;
            assert_eq!(combined.result.is_subset, checker.is_subset(&sub, &sup));
            assert_eq!(combined.resolved_sub.resolved, sub);
            assert_eq!(combined.resolved_sup.resolved, sup);
        }
    }

    #[test]
    fn test_check_resolved_with_separate_sup_data() {
        let checker = checker();
        let result = checker.check_resolved(
            &account_schema(),
            &account_schema(),
            &json!({"accountType": "business"}),
            Some(&json!({"accountType": "personal"})),
        );
        assert!(!result.result.is_subset);
        assert_eq!(
            result.resolved_sup.resolved["required"],
            json!(["firstName"])
        );
    }

    #[test]
    fn test_diff_completeness() {
        let checker = checker();
        let pairs = [
            (json!({}), json!({"type": "string"})),
            (json!({"type": "number"}), json!({"type": "integer"})),
            (
                json!({"type": "object", "properties": {"age": {"type": "integer"}}}),
                json!({
                    "type": "object",
                    "properties": {"age": {"type": "integer", "minimum": 0}},
                    "required": ["age"]
                }),
            ),
            (
                json!({"type": "array", "items": {"type": "string"}}),
                json!({"type": "array", "items": {"type": "string", "maxLength": 5}}),
            ),
        ];
        for (sub, sup) in pairs {
            let result = checker.check(&sub, &sup);
            assert!(!result.is_subset, "{sub} <= {sup}");
            assert!(!result.diffs.is_empty());
            let merged = result.merged.expect("intersection exists");
            let sub = normalize(&sub);
            for diff in &result.diffs {
                let before = lookup(&sub, &diff.path);
                let after = lookup(&merged, &diff.path);
                assert_ne!(before, after, "no divergence at {}", diff.path);
            }
        }
    }

    #[test]
    fn test_incompatible_check_reports_merge_error() {
        let checker = checker();
        let result = checker.check(&json!({"type": "string"}), &json!({"type": "integer"}));
        assert!(!result.is_subset);
        assert_eq!(result.merged, None);
        assert_eq!(result.diffs.len(), 1);
        assert_eq!(result.diffs[0].path, ".type");
        assert_eq!(result.diffs[0].kind, DiffKind::Changed);
    }

    #[test]
    fn test_inclusive_bound_implies_exclusive() {
        let checker = checker();
        assert!(checker.is_subset(
            &json!({"type": "integer", "minimum": 1}),
            &json!({"type": "number", "exclusiveMinimum": 0})
        ));
        assert!(checker.is_subset(
            &json!({"type": "number", "maximum": 10}),
            &json!({"type": "number", "exclusiveMaximum": 10.5})
        ));
        assert!(!checker.is_subset(
            &json!({"type": "number", "exclusiveMinimum": 0}),
            &json!({"type": "number", "minimum": 1})
        ));
        assert!(!checker.is_subset(
            &json!({"type": "number", "minimum": 0}),
            &json!({"type": "number", "exclusiveMinimum": 0})
        ));
    }

    #[test]
    fn test_can_connect() {
        let checker = checker();
        let producer = json!({
            "type": "object",
            "properties": {"id": {"type": "string", "format": "uuid"}},
            "required": ["id"]
        });
        let consumer = json!({
            "type": "object",
            "properties": {"id": {"type": "string"}},
            "required": ["id"]
        });
        let result = checker.can_connect(&producer, &consumer);
        assert!(result.result.is_subset);
        assert_eq!(result.direction, CONNECT_DIRECTION);
        assert!(!checker.can_connect(&consumer, &producer).result.is_subset);

        let serialized = serde_json::to_value(&result).unwrap();
        assert_eq!(serialized["isSubset"], json!(true));
        assert_eq!(serialized["direction"], json!("sourceOutput \u{2286} targetInput"));
        assert!(serialized.get("diffs").is_some());

        let failed = serde_json::to_value(checker.can_connect(&consumer, &producer)).unwrap();
        let diffs = failed["diffs"].as_array().unwrap();
        assert!(!diffs.is_empty());
        assert!(diffs.iter().all(|d| d.get("kind").is_some() && d.get("type").is_none()));
    }

    #[test]
    fn test_intersect_normalizes() {
        let checker = checker();
        assert_eq!(
            checker.intersect(
                &json!({"type": "integer", "minimum": 0}),
                &json!({"type": "number", "maximum": 10})
            ),
            Some(json!({"type": "integer", "minimum": 0, "maximum": 10}))
        );
        assert_eq!(
            checker.intersect(&json!({"enum": ["a", "b"]}), &json!({"enum": ["b", "c"]})),
            Some(json!({"const": "b", "type": "string"}))
        );
    }

    #[test]
    fn test_format_result() {
        let checker = checker();
        let passing = checker.check(
            &json!({"type": "string", "format": "email"}),
            &json!({"type": "string"}),
        );
        assert_eq!(format_result("email", &passing), "\u{2705} email: true");

        let failing = checker.check(&json!({}), &json!({"type": "string"}));
        let rendered = format_result("any", &failing);
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines[0], "\u{274C} any: false");
        assert_eq!(lines[1], "  + $.type: \"string\"");

        let manual = SubsetResult {
            is_subset: false,
            merged: None,
            diffs: vec![
                SchemaDiff {
                    path: ".minimum".to_owned(),
                    kind: DiffKind::Removed,
                    expected: json!(3),
                    actual: Value::Null,
                },
                SchemaDiff {
                    path: ".type".to_owned(),
                    kind: DiffKind::Changed,
                    expected: json!("number"),
                    actual: json!("integer"),
                },
            ],
        };
        assert_eq!(
            format_result("manual", &manual),
            "\u{274C} manual: false\n  - $.minimum: was 3\n  ~ $.type: \"number\" \u{2192} \"integer\""
        );
    }

    #[test]
    fn test_config_and_caches() {
        let config = CheckerConfig {
            pattern_sample_count: 25,
            ..CheckerConfig::default()
        };
        let checker = SchemaChecker::with_config(config);
        assert_eq!(checker.config().pattern_sample_count, 25);

        assert_eq!(checker.is_pattern_subset("^[a-z]{3}$", "^[a-z]+$"), Some(true));
        assert!(checker.caches().stats().verdicts > 0);
        checker.clear_caches();
        assert_eq!(checker.caches().stats().verdicts, 0);
        assert_eq!(checker.caches().stats().regexes, 0);
    }

    #[test]
    fn test_checker_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SchemaChecker>();
    }

    struct CountingMerge {
        inner: AllOfMerge,
        calls: Arc<AtomicUsize>,
    }

    impl MergePrimitive for CountingMerge {
        fn shallow_merge(&self, a: &Value, b: &Value) -> Result<Value, MergeError> {
            self.calls.fetch_add(1, AtomicOrdering::SeqCst);
            self.inner.shallow_merge(a, b)
        }

        fn compare(&self, a: &Value, b: &Value) -> Ordering {
            self.inner.compare(a, b)
        }
    }

    #[test]
    fn test_custom_primitive() {
        let calls = Arc::new(AtomicUsize::new(0));
        let primitive = CountingMerge {
            inner: AllOfMerge::new(Arc::default()),
            calls: Arc::clone(&calls),
        };
        let checker = SchemaChecker::with_primitive(CheckerConfig::default(), Box::new(primitive));
        let merged = checker.intersect(&json!({"minimum": 1}), &json!({"maximum": 5}));
        assert_eq!(merged, Some(json!({"minimum": 1, "maximum": 5})));
        assert_eq!(calls.load(AtomicOrdering::SeqCst), 1);
    }

    fn validator(schema: &Value) -> jsonschema::Validator {
        jsonschema::draft7::new(schema).expect("valid draft-07 schema")
    }

    /// Instances accepted by a reported subset must be accepted by its superset.
    #[test]
    fn test_subsets_agree_with_validator() {
        let checker = checker();
        let instances = [
            json!(-1),
            json!(0),
            json!(1),
            json!(2),
            json!(2.5),
            json!(5),
            json!(10),
            json!(11),
            json!("x"),
            json!("abc"),
            json!("abcd"),
            json!("active"),
            json!("deleted"),
            json!(null),
            json!({"a": "someone@example.com"}),
            json!({"a": 3}),
            json!({}),
        ];
        let pairs = [
            (
                json!({"type": "integer", "minimum": 0, "maximum": 10}),
                json!({"type": "number", "minimum": -5}),
            ),
            (json!({"const": "x"}), json!({"enum": ["x", "y"]})),
            (json!({"enum": [1, 2]}), json!({"enum": [1, 2, 3]})),
            (
                json!({"type": "string", "pattern": "^[a-z]{3}$"}),
                json!({"type": "string", "pattern": "^[a-z]+$"}),
            ),
            (
                json!({"type": "string", "const": "active"}),
                json!({"not": {"const": "deleted"}}),
            ),
            (
                json!({
                    "type": "object",
                    "properties": {"a": {"type": "string", "format": "email"}},
                    "required": ["a"]
                }),
                json!({"type": "object", "required": ["a"]}),
            ),
        ];
        for (sub, sup) in pairs {
            assert!(checker.is_subset(&sub, &sup), "{sub} <= {sup}");
            let (inner, outer) = (validator(&sub), validator(&sup));
            for instance in &instances {
                if inner.is_valid(instance) {
                    assert!(outer.is_valid(instance), "{instance} escapes {sup}");
                }
            }
        }
    }

    #[test]
    fn test_non_subset_has_witness() {
        let checker = checker();
        let (sub, sup) = (json!({"type": "number"}), json!({"type": "integer"}));
        assert!(!checker.is_subset(&sub, &sup));
        let witness = json!(2.5);
        assert!(validator(&sub).is_valid(&witness));
        assert!(!validator(&sup).is_valid(&witness));
    }

    fn arb_schema() -> impl Strategy<Value = Value> {
        let leaf = prop_oneof![
            Just(json!({})),
            prop::sample::select(vec![
                "string", "integer", "number", "boolean", "null", "object", "array",
            ])
            .prop_map(|t| json!({"type": t})),
            (0i64..5).prop_map(|c| json!({"const": c})),
            prop::collection::vec(0i64..5, 1..4).prop_map(|members| json!({"enum": members})),
            (0i64..10, 10i64..20)
                .prop_map(|(lo, hi)| json!({"type": "integer", "minimum": lo, "maximum": hi})),
            (0usize..3).prop_map(|n| json!({"type": "string", "minLength": n})),
        ];
        leaf.prop_recursive(2, 8, 3, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 1..3)
                    .prop_map(|branches| json!({"anyOf": branches})),
                inner
                    .clone()
                    .prop_map(|items| json!({"type": "array", "items": items})),
                prop::collection::btree_map("[a-c]", inner, 1..3)
                    .prop_map(|props| json!({"type": "object", "properties": props})),
            ]
        })
    }

    proptest! {
        #[test]
        fn prop_subset_is_reflexive(schema in arb_schema()) {
            let checker = SchemaChecker::new();
            prop_assert!(checker.is_subset(&schema, &schema));
            let empty = json!({});
            prop_assert!(checker.is_subset(&schema, &empty));
            prop_assert!(checker.is_subset(&json!(false), &schema));
        }

        #[test]
        fn prop_normalize_is_idempotent(schema in arb_schema()) {
            let once = normalize(&schema);
            prop_assert_eq!(normalize(&once), once);
        }
    }
}
