use mg_core::error::Error;
use pretty_assertions::assert_eq;

use crate::transpile::{transpile_files, transpile_source};

#[test]
fn parse_and_print_plain_go_round_trip() {
    let source = concat!(
        "package main\n",
        "\n",
        "import \"fmt\"\n",
        "\n",
        "type User struct {\n",
        "    Name string\n",
        "    Age int\n",
        "}\n",
        "\n",
        "func main() {\n",
        "    u := User{Name: \"ada\", Age: 36}\n",
        "    fmt.Println(u.Name)\n",
        "}\n",
    );
    let output = transpile_source("plain.mgo", source).expect("transpile should succeed");
    assert!(output.code.contains("package main"));
    assert!(output.code.contains("import \"fmt\""));
    assert!(output.code.contains("type User struct {"));
    assert!(output.code.contains("u := User{Name: \"ada\", Age: 36}"));
    assert!(output.code.contains("fmt.Println(u.Name)"));
}

#[test]
fn literal_constructor_payload_goes_through_temporary() {
    let source = concat!(
        "package main\n",
        "\n",
        "func answer() Result<int, error> {\n",
        "    return Ok(42)\n",
        "}\n",
    );
    let output = transpile_source("answer.mgo", source).expect("transpile should succeed");
    assert!(
        output.code.contains(
            "return Result_int_error{tag: ResultTag_Ok, ok_0: func() *int { __tmp0 := 42; return &__tmp0 }()}"
        ),
        "generated code was:\n{}",
        output.code
    );
}

#[test]
fn identifier_constructor_payload_takes_direct_address() {
    let source = concat!(
        "package main\n",
        "\n",
        "func relay(x int) Result<int, error> {\n",
        "    return Ok(x)\n",
        "}\n",
    );
    let output = transpile_source("relay.mgo", source).expect("transpile should succeed");
    assert!(
        output
            .code
            .contains("return Result_int_error{tag: ResultTag_Ok, ok_0: &x}"),
        "generated code was:\n{}",
        output.code
    );
    assert!(!output.code.contains("__tmp"));
}

#[test]
fn same_instantiation_is_declared_exactly_once() {
    let source = concat!(
        "package main\n",
        "\n",
        "func one() Result<int, error> {\n",
        "    return Ok(1)\n",
        "}\n",
        "\n",
        "func two() Result<int, error> {\n",
        "    return Ok(2)\n",
        "}\n",
    );
    let output = transpile_source("twice.mgo", source).expect("transpile should succeed");
    assert_eq!(
        output.code.matches("type Result_int_error struct").count(),
        1,
        "generated code was:\n{}",
        output.code
    );
    assert_eq!(output.code.matches("type ResultTag int").count(), 1);
    // Distinct temporaries for the two literal payloads.
    assert!(output.code.contains("__tmp0 := 1"));
    assert!(output.code.contains("__tmp1 := 2"));
}

#[test]
fn distinct_instantiations_each_get_a_declaration() {
    let source = concat!(
        "package main\n",
        "\n",
        "func a() Result<int, error> {\n",
        "    return Ok(1)\n",
        "}\n",
        "\n",
        "func b() Result<string, error> {\n",
        "    return Ok(\"done\")\n",
        "}\n",
    );
    let output = transpile_source("multi.mgo", source).expect("transpile should succeed");
    assert!(output.code.contains("type Result_int_error struct"));
    assert!(output.code.contains("type Result_string_error struct"));
    // One shared tag enum per container kind.
    assert_eq!(output.code.matches("type ResultTag int").count(), 1);
}

#[test]
fn match_compiles_to_deterministic_switch() {
    let source = concat!(
        "package main\n",
        "\n",
        "func pick(r Result<int, error>) int {\n",
        "    return match r {\n",
        "        Ok(x) => x,\n",
        "        Err(_) => -1,\n",
        "    }\n",
        "}\n",
    );
    let output = transpile_source("pick.mgo", source).expect("transpile should succeed");
    let err_at = output.code.find("case ResultTag_Err:").expect("err case");
    let ok_at = output.code.find("case ResultTag_Ok:").expect("ok case");
    assert!(err_at < ok_at, "cases must sort alphabetically");
    assert!(output.code.contains("x := *r.ok_0"));
    assert!(output
        .code
        .contains("panic(\"unreachable: non-exhaustive match\")"));

    let first = output.code.clone();
    for _ in 0..3 {
        let again = transpile_source("pick.mgo", source).expect("transpile should succeed");
        assert_eq!(first, again.code, "output must be byte-identical per run");
    }
}

#[test]
fn nested_match_switches_on_inner_tag() {
    let source = concat!(
        "package main\n",
        "\n",
        "func unwrap(r Result<Option<int>, error>) int {\n",
        "    return match r {\n",
        "        Ok(Some(v)) => v,\n",
        "        Ok(None) => 0,\n",
        "        Err(_) => -1,\n",
        "    }\n",
        "}\n",
    );
    let output = transpile_source("unwrap.mgo", source).expect("transpile should succeed");
    assert!(output.code.contains("__tmp0 := r.ok_0"));
    assert!(output.code.contains("switch __tmp0.tag {"));
    assert!(output.code.contains("case OptionTag_None:"));
    assert!(output.code.contains("v := *__tmp0.some_0"));
    assert!(output.code.contains("type Option_int struct"));
}

#[test]
fn missing_variant_without_wildcard_fails_compilation() {
    let source = concat!(
        "package main\n",
        "\n",
        "func partial(r Result<int, error>) int {\n",
        "    return match r {\n",
        "        Ok(x) => x,\n",
        "    }\n",
        "}\n",
    );
    let err = transpile_source("partial.mgo", source).unwrap_err();
    match err {
        Error::Exhaustiveness { missing, .. } => {
            assert_eq!(missing, vec!["Err(_)".to_string()]);
        }
        other => panic!("expected exhaustiveness error, got: {other}"),
    }
}

#[test]
fn wildcard_makes_any_coverage_compile() {
    let source = concat!(
        "package main\n",
        "\n",
        "func lenient(r Result<int, error>) int {\n",
        "    return match r {\n",
        "        Ok(x) => x,\n",
        "        _ => 0,\n",
        "    }\n",
        "}\n",
    );
    let output = transpile_source("lenient.mgo", source).expect("wildcard always compiles");
    let default_at = output.code.find("default:").expect("default present");
    let ok_at = output.code.find("case ResultTag_Ok:").expect("ok case");
    assert!(ok_at < default_at, "default is lexically last");
}

#[test]
fn user_enum_round_trips_through_constructor_and_match() {
    let source = concat!(
        "package main\n",
        "\n",
        "enum Shape {\n",
        "    Circle(float64),\n",
        "    Point,\n",
        "}\n",
        "\n",
        "func area(s Shape) float64 {\n",
        "    return match s {\n",
        "        Circle(r) => r * r,\n",
        "        Point => 0.0,\n",
        "    }\n",
        "}\n",
        "\n",
        "func unit() Shape {\n",
        "    return Point\n",
        "}\n",
        "\n",
        "func circle(r float64) Shape {\n",
        "    return Circle(r)\n",
        "}\n",
    );
    let output = transpile_source("shape.mgo", source).expect("transpile should succeed");
    assert!(output.code.contains("type ShapeTag int"));
    assert!(output.code.contains("ShapeTag_Circle ShapeTag = iota"));
    assert!(output.code.contains("case ShapeTag_Circle:"));
    assert!(output.code.contains("r := *s.circle_0"));
    assert!(output
        .code
        .contains("return Shape{tag: ShapeTag_Point}"));
    assert!(output
        .code
        .contains("return Shape{tag: ShapeTag_Circle, circle_0: &r}"));
}

#[test]
fn try_operator_expands_and_rewraps_the_error() {
    let source = concat!(
        "package main\n",
        "\n",
        "func parse(s string) Result<int, error> {\n",
        "    return Ok(1)\n",
        "}\n",
        "\n",
        "func run(s string) Result<int, error> {\n",
        "    x := parse(s)?\n",
        "    return Ok(x + 1)\n",
        "}\n",
    );
    let output = transpile_source("try.mgo", source).expect("transpile should succeed");
    assert!(output.code.contains("__tmp0 := parse(s)"));
    assert!(output.code.contains("if __tmp0.tag == ResultTag_Err {"));
    // `*__tmp0.err_0` is addressable, so the re-wrap takes its address
    // directly instead of a temporary.
    assert!(
        output
            .code
            .contains("return Result_int_error{tag: ResultTag_Err, err_0: &*__tmp0.err_0}"),
        "generated code was:\n{}",
        output.code
    );
    assert!(output.code.contains("x := *__tmp0.ok_0"));

    let mapping = output
        .mappings
        .entries()
        .iter()
        .find(|m| m.name.as_deref() == Some("?"))
        .expect("? mapping recorded");
    assert_eq!(mapping.length, 1);
    assert_eq!(mapping.original.line, 8);
    assert_eq!(mapping.original.column, 18);
}

#[test]
fn inference_failure_is_an_explicit_error() {
    let source = concat!(
        "package main\n",
        "\n",
        "func mystery() {\n",
        "    x := Ok(42)\n",
        "    _ = x\n",
        "}\n",
    );
    let err = transpile_source("mystery.mgo", source).unwrap_err();
    match err {
        Error::TypeInference { expr, .. } => assert_eq!(expr, "Ok(42)"),
        other => panic!("expected type inference error, got: {other}"),
    }
}

#[test]
fn user_function_named_ok_is_not_rewritten() {
    let source = concat!(
        "package main\n",
        "\n",
        "func Ok(status int) int {\n",
        "    return status\n",
        "}\n",
        "\n",
        "func check() int {\n",
        "    return Ok(204)\n",
        "}\n",
    );
    let output = transpile_source("shadow.mgo", source).expect("transpile should succeed");
    assert!(output.code.contains("return Ok(204)"));
    assert!(!output.code.contains("ResultTag"));
}

#[test]
fn helper_methods_are_emitted_per_instantiation() {
    let source = concat!(
        "package main\n",
        "\n",
        "func answer() Result<int, error> {\n",
        "    return Ok(42)\n",
        "}\n",
    );
    let output = transpile_source("helpers.mgo", source).expect("transpile should succeed");
    assert!(output
        .code
        .contains("func (v Result_int_error) IsOk() bool {"));
    assert!(output
        .code
        .contains("func (v Result_int_error) IsErr() bool {"));
    assert!(output.code.contains("return v.tag == ResultTag_Ok"));
}

#[test]
fn source_map_serializes_as_tuples() {
    let source = concat!(
        "package main\n",
        "\n",
        "func pick(r Result<int, error>) int {\n",
        "    return match r {\n",
        "        Ok(x) => x,\n",
        "        Err(_) => -1,\n",
        "    }\n",
        "}\n",
    );
    let output = transpile_source("map.mgo", source).expect("transpile should succeed");
    assert!(!output.mappings.is_empty());
    let json = output.mappings.to_json().expect("serializable");
    let parsed: serde_json::Value = serde_json::from_str(&json).expect("valid json");
    let first = parsed
        .as_array()
        .and_then(|rows| rows.first())
        .and_then(|row| row.as_array())
        .expect("tuple rows");
    assert_eq!(first.len(), 6);
}

#[test]
fn files_transpile_independently_in_parallel() {
    let unit = concat!(
        "package main\n",
        "\n",
        "func answer() Result<int, error> {\n",
        "    return Ok(42)\n",
        "}\n",
    );
    let inputs: Vec<(String, String)> = (0..8)
        .map(|i| (format!("file{i}.mgo"), unit.to_string()))
        .collect();
    let outputs = transpile_files(&inputs);
    assert_eq!(outputs.len(), 8);
    let first = outputs[0].as_ref().expect("transpile should succeed");
    for output in &outputs {
        let output = output.as_ref().expect("transpile should succeed");
        // Isolated temp counters: every file starts at __tmp0.
        assert!(output.code.contains("__tmp0 := 42"));
        assert_eq!(output.code, first.code);
    }
}
