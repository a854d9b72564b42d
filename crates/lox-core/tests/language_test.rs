//! Language Integration Tests
//!
//! Runs whole programs through the public engine API and checks what
//! they print, the value they produce and the errors they raise.

use lox_core::{Engine, EngineConfig, Error, OutputBuffer, Value};

/// An engine that prints into a buffer the test can inspect.
fn engine() -> (Engine, OutputBuffer) {
    let output = OutputBuffer::new();
    let engine = Engine::new().with_output(output.clone());
    (engine, output)
}

/// Run a program on a fresh engine and return what it printed.
fn run(source: &str) -> String {
    let (mut engine, output) = engine();
    if let Err(err) = engine.eval(source) {
        panic!("{:?} failed: {}", source, err);
    }
    output.contents()
}

/// Run a program on an existing engine, clearing earlier output first.
fn run_in(engine: &mut Engine, output: &OutputBuffer, source: &str) -> String {
    output.clear();
    if let Err(err) = engine.eval(source) {
        panic!("{:?} failed: {}", source, err);
    }
    output.contents()
}

/// Run a program that must fail and return the error.
fn run_err(source: &str) -> Error {
    let (mut engine, _) = engine();
    match engine.eval(source) {
        Ok(value) => panic!("{:?} should fail, got {}", source, value),
        Err(err) => err,
    }
}

// Statements and expressions

#[test]
fn test_datatypes() {
    assert_eq!(run("print true;"), "true\n");
    assert_eq!(run("print false;"), "false\n");
    assert_eq!(run("print \"Hello, World!\";"), "Hello, World!\n");
    assert_eq!(run("print 42;"), "42\n");
    assert_eq!(run("print 2.5;"), "2.5\n");
    assert_eq!(run("print nil;"), "nil\n");
}

#[test]
fn test_expression_statements_print_nothing() {
    assert_eq!(run("3 + 4;"), "");
    assert_eq!(run("{3 + 4;}"), "");
}

#[test]
fn test_two_statements() {
    assert_eq!(run("print 1; print 2;"), "1\n2\n");
    assert_eq!(run("print 1;\n print 2;"), "1\n2\n");
}

#[test]
fn test_unary() {
    assert_eq!(run("print !true;"), "false\n");
    assert_eq!(run("print !false;"), "true\n");
    assert_eq!(run("print !nil;"), "true\n");
    assert_eq!(run("print -1;"), "-1\n");
    assert_eq!(run("print -1.5;"), "-1.5\n");
}

#[test]
fn test_logical_operators() {
    assert_eq!(run("print true or false;"), "true\n");
    assert_eq!(run("print false or false;"), "false\n");
    assert_eq!(run("print true and false;"), "false\n");
    assert_eq!(run("print true and true;"), "true\n");
}

#[test]
fn test_logical_operators_short_circuit() {
    let output = run(
        "var calls = 0;
         fun touch() { calls = calls + 1; return true; }
         false and touch();
         true or touch();
         print calls;
         print nil or \"fallback\";
         print 1 and 2;",
    );
    assert_eq!(output, "0\nfallback\n2\n");
}

#[test]
fn test_arithmetic() {
    assert_eq!(run("print 1 + 2;"), "3\n");
    assert_eq!(run("print 1 + 2 + 3 + 4 + 5;"), "15\n");
    assert_eq!(run("print 1 - 2;"), "-1\n");
    assert_eq!(run("print 1 * 2;"), "2\n");
    assert_eq!(run("print 1 / 2;"), "0.5\n");
    assert_eq!(run("print 6 / 3;"), "2\n");
    assert_eq!(run("print 1 + 0.5;"), "1.5\n");
}

#[test]
fn test_comparison() {
    assert_eq!(run("print 1 < 2;"), "true\n");
    assert_eq!(run("print 1 <= 2;"), "true\n");
    assert_eq!(run("print 1 > 2;"), "false\n");
    assert_eq!(run("print 1 >= 2;"), "false\n");
    assert_eq!(run("print 1 == 2;"), "false\n");
    assert_eq!(run("print 1 != 2;"), "true\n");
}

#[test]
fn test_equality_never_coerces() {
    assert_eq!(run("print 1 == 1.0;"), "false\n");
    assert_eq!(run("print nil == false;"), "false\n");
    assert_eq!(run("print \"a\" == \"a\";"), "true\n");
}

#[test]
fn test_precedence_and_grouping() {
    assert_eq!(run("print 1 + 2 * 3;"), "7\n");
    assert_eq!(run("print 1 * 2 + 3;"), "5\n");
    assert_eq!(run("print 1 + 2 == 3;"), "true\n");
    assert_eq!(run("print 3 == 1 + 2;"), "true\n");
    assert_eq!(run("print (1 + 2) * 3;"), "9\n");
    assert_eq!(run("print 1 + (2 * 3);"), "7\n");
}

#[test]
fn test_string_concatenation() {
    assert_eq!(run("print \"a\" + 1;"), "a1\n");
    assert_eq!(run("print 2.5 + \"x\";"), "2.5x\n");
    assert_eq!(run("print \"list: \" + [1, 2];"), "list: [1, 2]\n");
}

#[test]
fn test_type_errors() {
    let err = run_err("print true + 1;");
    assert!(matches!(err, Error::TypeError(_)));
    assert!(err.to_string().contains("cannot add true and 1"));

    let err = run_err("print \"a\" < \"b\";");
    assert_eq!(err.to_string(), "TypeError: Cannot compare a and b");

    let err = run_err("print -\"x\";");
    assert!(matches!(err, Error::TypeError(_)));
}

#[test]
fn test_division_by_zero() {
    let err = run_err("print 1 / 0;");
    assert_eq!(err.to_string(), "RuntimeError: Cannot divide by zero");
    let err = run_err("print 1 % 0;");
    assert_eq!(err.to_string(), "RuntimeError: Cannot modulo by zero");
}

// Variables

#[test]
fn test_variables() {
    assert_eq!(run("var a = 3; print a;"), "3\n");
    assert_eq!(run("{var a = 4; print a;}"), "4\n");
    assert_eq!(run("var a = 1; print a = 2;"), "2\n");
    assert_eq!(run("var a; print a = 5;"), "5\n");
}

#[test]
fn test_shadowing() {
    assert_eq!(
        run("var a = 3; print a; {var a = 4; print a;} print a;"),
        "3\n4\n3\n"
    );
    assert_eq!(
        run("{var a = 1; {var a = 2; print a;} print a;}"),
        "2\n1\n"
    );
}

#[test]
fn test_read_undefined_local() {
    let err = run_err("{var a; print a;}");
    assert!(matches!(err, Error::ReferenceError(_)));
    assert!(err.to_string().contains("not defined"));
}

#[test]
fn test_read_undeclared() {
    let err = run_err("{print a;}");
    assert!(matches!(err, Error::ReferenceError(_)));
    assert!(err.to_string().contains("not declared"));
}

#[test]
fn test_read_undefined_global() {
    let err = run_err("var a; print a;");
    assert_eq!(err.to_string(), "ReferenceError: Variable a was not defined");
}

#[test]
fn test_assign_undeclared_global() {
    let err = run_err("b = 1;");
    assert!(err.to_string().contains("Variable b was not declared"));
}

#[test]
fn test_local_initializer_cannot_read_itself() {
    let err = run_err("{var a = a;}");
    assert!(err.to_string().contains("not defined"));
}

#[test]
fn test_global_redeclaration_warns() {
    let output = run("var a = 1; var a = 2; print a;");
    assert_eq!(output, "Warning: Variable a was already declared\n2\n");
}

#[test]
fn test_global_redeclaration_warning_disabled() {
    let output = OutputBuffer::new();
    let mut engine = Engine::with_config(EngineConfig::default().warn_on_redeclare(false))
        .with_output(output.clone());
    engine.eval("var a = 1; var a = 2; print a;").unwrap();
    assert_eq!(output.contents(), "2\n");
}

#[test]
fn test_fresh_engines_produce_identical_output() {
    let program = "var total = 0;
         fun add(n) { total = total + n; return total; }
         var xs = [1, 2.5, \"three\"];
         for (var x of xs) { if (x != \"three\") add(x); }
         print total;
         print xs;";
    let first = run(program);
    let second = run(program);
    assert_eq!(first, "3.5\n[1, 2.5, \"three\"]\n");
    assert_eq!(first, second);
    assert!(!first.contains("Warning:"));

    let (mut engine, output) = engine();
    assert_eq!(run_in(&mut engine, &output, program), first);
    let rerun = run_in(&mut engine, &output, program);
    assert!(rerun.contains("Warning: Variable total was already declared\n"));
    assert!(rerun.contains("Warning: Variable xs was already declared\n"));
    let without_warnings: String = rerun
        .lines()
        .filter(|line| !line.starts_with("Warning:"))
        .map(|line| format!("{}\n", line))
        .collect();
    assert_eq!(without_warnings, first);
}

#[test]
fn test_golang_declaration() {
    assert_eq!(run("a := 3; print a;"), "3\n");
    assert_eq!(run("a := 2 + 3; print a;"), "5\n");
    assert_eq!(run("{ b := 7; print b; }"), "7\n");
}

#[test]
fn test_globals_persist_between_runs() {
    let (mut engine, output) = engine();
    run_in(&mut engine, &output, "var a = [1, \"hello\"];");
    assert_eq!(run_in(&mut engine, &output, "print a[0];"), "1\n");
    assert_eq!(run_in(&mut engine, &output, "print a[1];"), "hello\n");
}

#[test]
fn test_eval_result_is_last_expression() {
    let (mut engine, _) = engine();
    assert_eq!(engine.eval("var x = 4; x * x;").unwrap(), Value::Int(16));
    assert_eq!(engine.eval("print x;").unwrap(), Value::Nil);
}

// Control flow

#[test]
fn test_if() {
    assert_eq!(run("if(true) print 1;"), "1\n");
    assert_eq!(run("if(true) { print 1;}"), "1\n");
    assert_eq!(run("if(false) print 1;"), "");
    assert_eq!(run("if(true) print 1; else print 2;"), "1\n");
    assert_eq!(run("if(false) print 1; else print 2;"), "2\n");
}

#[test]
fn test_truthiness_in_conditions() {
    assert_eq!(run("if(1) print 3;"), "3\n");
    assert_eq!(run("if(0) print 3;"), "3\n");
    assert_eq!(run("if(\"hello\") print 3;"), "3\n");
    assert_eq!(run("if(nil) print 3;"), "");
    assert_eq!(run("if(nil) print 3; else print 4;"), "4\n");
    assert_eq!(run("var a = true; while(a) { print a; a = nil;}"), "true\n");
    assert_eq!(run("for(var a=true; a ; a = nil) { print a;}"), "true\n");
}

#[test]
fn test_while_loop() {
    assert_eq!(
        run("var i=0; while(i < 3) { i = i + 1; print i;}"),
        "1\n2\n3\n"
    );
}

#[test]
fn test_for_loop() {
    assert_eq!(
        run("for(var i=1; i <= 3; i = i + 1) {print i;}"),
        "1\n2\n3\n"
    );
    assert_eq!(
        run("var i; for(i=1; i <= 3; i = i + 1) {print i;}"),
        "1\n2\n3\n"
    );
    assert_eq!(run("var n = 0; for(;;) { n = n + 1; if (n == 3) break; } print n;"), "3\n");
}

#[test]
fn test_for_loop_variable_is_scoped() {
    let err = run_err("{ for(var i = 0; i < 1; i = i + 1) {} print i; }");
    assert!(err.to_string().contains("not declared"));
}

#[test]
fn test_while_break() {
    assert_eq!(
        run("var i = 0; while (true) { i = i + 1; if (i > 100) break; } print i;"),
        "101\n"
    );
}

#[test]
fn test_for_break() {
    let expected: String = (0..50).map(|i| format!("{}\n", i)).collect();
    assert_eq!(
        run("for(var i = 0; i < 100; i = i + 1) { if (i == 50) break; print i; }"),
        expected
    );
}

#[test]
fn test_for_break_skips_increment() {
    assert_eq!(
        run(
            "var n = 0;
             for (var i = 0; i < 10; n = n + 1) { if (i == 3) break; i = i + 1; }
             print n;"
        ),
        "3\n"
    );
}

#[test]
fn test_while_continue() {
    assert_eq!(
        run(
            "var i = 0; var sum = 0;
             while (true) {
                 i = i + 1;
                 if (i % 2 == 0) continue;
                 sum = sum + i;
                 if (i > 100) break;
             }
             print sum;"
        ),
        "2601\n"
    );
}

#[test]
fn test_for_continue_runs_increment() {
    let expected: String = (0..100)
        .filter(|i| !(*i > 10 && *i < 20))
        .map(|i| format!("{}\n", i))
        .collect();
    assert_eq!(
        run("for(var i=0; i < 100; i = i + 1) { if (i > 10 and i < 20) continue; print i; }"),
        expected
    );
}

#[test]
fn test_break_exits_innermost_loop() {
    let output = run(
        "for (var i = 0; i < 3; i = i + 1) {
             for (var j = 0; j < 3; j = j + 1) {
                 if (j == 1) break;
                 print \"${i}:${j}\";
             }
         }",
    );
    assert_eq!(output, "0:0\n1:0\n2:0\n");
}

#[test]
fn test_break_outside_loop() {
    let err = run_err("break;");
    assert!(matches!(err, Error::CompileError { .. }));
    assert!(err.to_string().contains("Cannot use 'break' outside of a loop"));

    let err = run_err("continue;");
    assert!(err.to_string().contains("Cannot use 'continue' outside of a loop"));
}

#[test]
fn test_break_does_not_cross_functions() {
    let err = run_err("while (true) { fun f() { break; } }");
    assert!(err.to_string().contains("outside of a loop"));
}

#[test]
fn test_ruby_like_guards() {
    let (mut engine, output) = engine();
    assert_eq!(
        run_in(&mut engine, &output, "var a = 5; print a if (a > 0);"),
        "5\n"
    );
    assert_eq!(run_in(&mut engine, &output, "a = -3; print a if (a > 0);"), "");
    assert_eq!(
        run_in(&mut engine, &output, "a = 5; print a unless (a < 0);"),
        "5\n"
    );
    assert_eq!(run_in(&mut engine, &output, "a = -3; print a unless (a < 0);"), "");
}

#[test]
fn test_guarded_control_statements() {
    assert_eq!(
        run("var i = 0; while (true) { i = i + 1; break if (i == 4); } print i;"),
        "4\n"
    );
    assert_eq!(
        run("fun f(x) { return \"neg\" if (x < 0); return \"pos\"; } print f(-1); print f(1);"),
        "neg\npos\n"
    );
}

#[test]
fn test_chain_comparisons() {
    assert_eq!(run("print 6 > 4 > 3;"), "true\n");
    assert_eq!(run("print 6 > 4 > 3 > 2;"), "true\n");
    assert_eq!(run("print 10 > 5 < 8;"), "true\n");
    assert_eq!(run("print 10 > 5 > 8;"), "false\n");
    assert_eq!(run("print 3 >= 3 > 2;"), "true\n");
}

// Functions and closures

#[test]
fn test_function_declaration_and_call() {
    assert_eq!(run("print 2;fun f() { print 1; }; print 3;"), "2\n3\n");
    assert_eq!(run("fun f() { print 1; } f();f();"), "1\n1\n");
    assert_eq!(run("fun x() { print 1; };  var f = x; f();"), "1\n");
    assert_eq!(run("fun f(a) { print a; } f(1);"), "1\n");
    assert_eq!(run("fun f() { return 1; } print f();"), "1\n");
    assert_eq!(run("fun f() {} print f();"), "nil\n");
}

#[test]
fn test_function_display() {
    assert_eq!(run("fun answer() { return 42; } print answer;"), "Function answer\n");
    assert_eq!(run("print clock;"), "Function clock\n");
}

#[test]
fn test_argument_count_mismatch() {
    assert_eq!(run("fun f(a, b) { print b; } f(1);"), "nil\n");
    assert_eq!(run("fun f(a) { print a; } f(1, 2, 3);"), "1\n");
}

#[test]
fn test_recursion() {
    assert_eq!(
        run("fun fib(n) { if (n < 2) return n; return fib(n - 1) + fib(n - 2); } print fib(15);"),
        "610\n"
    );
}

#[test]
fn test_local_recursion() {
    assert_eq!(
        run("{ fun fact(n) { if (n < 2) return 1; return n * fact(n - 1); } print fact(20); }"),
        "2432902008176640000\n"
    );
}

#[test]
fn test_call_non_function() {
    let err = run_err("var a = 1; a();");
    assert!(matches!(err, Error::TypeError(_)));
    assert!(err.to_string().contains("cannot call 1"));
}

#[test]
fn test_stack_overflow() {
    let output = OutputBuffer::new();
    let mut engine = Engine::with_config(EngineConfig::default().max_call_depth(64))
        .with_output(output);
    let err = engine.eval("fun f() { return f(); } f();").unwrap_err();
    assert_eq!(err.to_string(), "RuntimeError: Stack overflow");
}

#[test]
fn test_deep_recursion_within_default_limit() {
    let program = "fun f(n) { if (n == 0) return 0; return 1 + f(n - 1); }";
    let (mut engine, _) = engine();
    engine.eval(program).unwrap();
    assert_eq!(engine.eval("f(500);").unwrap(), Value::Int(500));

    let err = engine.eval("f(600);").unwrap_err();
    assert_eq!(err.to_string(), "RuntimeError: Stack overflow");
}

#[test]
fn test_inner_function() {
    assert_eq!(
        run("fun outer() { fun inner() { return 1; } return inner(); } print outer();"),
        "1\n"
    );
}

#[test]
fn test_inner_function_reads_outer_variable() {
    assert_eq!(
        run("fun outer() { var a = 1; fun inner() { return a; } return inner(); } print outer();"),
        "1\n"
    );
}

#[test]
fn test_inner_function_stores_outer_variable() {
    assert_eq!(
        run(
            "fun outer() { var a = 1; fun inner() { a = 2; return a; } var r = inner(); print a; return r; }
             print outer();"
        ),
        "2\n2\n"
    );
}

#[test]
fn test_function_returns_function() {
    assert_eq!(
        run("fun outer() { fun inner() { return 1; } return inner; } print outer()();"),
        "1\n"
    );
}

#[test]
fn test_closure_outlives_its_frame() {
    let output = run(
        "fun counter() {
             var count = 0;
             fun increment() { count = count + 1; return count; }
             return increment;
         }
         var c = counter();
         c(); c();
         print c();
         var d = counter();
         print d();",
    );
    assert_eq!(output, "3\n1\n");
}

#[test]
fn test_closure_over_two_levels() {
    let output = run(
        "fun a() {
             var x = \"outer\";
             fun b() {
                 fun c() { return x; }
                 return c;
             }
             return b();
         }
         print a()();",
    );
    assert_eq!(output, "outer\n");
}

#[test]
fn test_closure_over_parameter() {
    assert_eq!(
        run("fun adder(n) { return x => x + n; } var add5 = adder(5); print add5(10);"),
        "15\n"
    );
}

#[test]
fn test_closure_over_undefined_local() {
    let err = run_err("fun f() { var a; fun g() { return a; } return g(); } f();");
    assert_eq!(err.to_string(), "ReferenceError: Variable a was not defined");
}

#[test]
fn test_functions_see_later_globals() {
    assert_eq!(run("fun f() { return g(); } fun g() { return 7; } print f();"), "7\n");
}

#[test]
fn test_lambdas() {
    assert_eq!(run("var f = () => 42; print f();"), "42\n");
    assert_eq!(run("var f = () => { return 99; }; print f();"), "99\n");
    assert_eq!(run("var f = x => x * 2; print f(5);"), "10\n");
    assert_eq!(run("var add = (a, b) => a + b; print add(3, 4);"), "7\n");
    assert_eq!(
        run("fun outer() { return () => { return 88; }; } var inner = outer(); print inner();"),
        "88\n"
    );
    assert_eq!(run("var f = () => {}; print f();"), "nil\n");
}

#[test]
fn test_varargs() {
    let program = "fun f(a, ...args) { print a; print args; }";
    assert_eq!(run(&format!("{} f(1, 2, 3, 4);", program)), "1\n[2, 3, 4]\n");
    assert_eq!(run(&format!("{} f(1);", program)), "1\n[]\n");
    assert_eq!(run(&format!("{} f(1, 2);", program)), "1\n[2]\n");
    assert_eq!(
        run("fun f(...args) { for (var i in args) { print args[i]; } } f(10, 20, 30);"),
        "10\n20\n30\n"
    );
}

#[test]
fn test_too_many_arguments() {
    let args: Vec<String> = (0..256).map(|i| i.to_string()).collect();
    let err = run_err(&format!("fun f() {{}} f({});", args.join(", ")));
    assert!(err.to_string().contains("Can't have more than 255 arguments"));
}

#[test]
fn test_clock() {
    let output = run("print clock();");
    let output = output.trim();
    assert!(
        output.chars().all(|c| c.is_ascii_digit() || c == '.' || c == 'e'),
        "Expected a number but got: {}",
        output
    );
    assert_eq!(run("print clock() > 0;"), "true\n");
}

// Arrays

#[test]
fn test_array_literals() {
    assert_eq!(run("var a = []; print a;"), "[]\n");
    assert_eq!(run("var a = [1, \"hello\"]; print a;"), "[1, \"hello\"]\n");
    assert_eq!(run("var a = [1, \"hello\"]; print a[0];"), "1\n");
    assert_eq!(run("var a = [1, \"hello\"]; a[0] = 42; print a;"), "[42, \"hello\"]\n");
    assert_eq!(run("print [nil, true, 1.5, [2]];"), "[nil, true, 1.5, [2]]\n");
}

#[test]
fn test_array_reads_past_end_are_nil() {
    assert_eq!(run("var a = []; print a[1];"), "nil\n");
    assert_eq!(run("var a = [1]; print a[-1];"), "nil\n");
}

#[test]
fn test_array_writes_grow_and_fill_with_nil() {
    assert_eq!(run("var a = []; a[0]=3; print a[0];"), "3\n");
    assert_eq!(
        run("var a = []; a[0]=3; a[1]=\"hello\"; print a;"),
        "[3, \"hello\"]\n"
    );
    assert_eq!(run("var a = []; a[2] = 1; print a;"), "[nil, nil, 1]\n");
}

#[test]
fn test_arrays_are_shared_by_reference() {
    assert_eq!(
        run("var a = [1]; var b = a; b[0] = 2; print a[0];"),
        "2\n"
    );
    assert_eq!(
        run("fun set(arr) { arr[0] = \"x\"; } var a = [1]; set(a); print a;"),
        "[\"x\"]\n"
    );
}

#[test]
fn test_index_assignment_value() {
    assert_eq!(run("var a = []; print a[0] = 9;"), "9\n");
}

#[test]
fn test_array_index_errors() {
    let err = run_err("var a = [1]; print a[\"x\"];");
    assert!(matches!(err, Error::TypeError(_)));
    assert!(err.to_string().contains("Array index must be an integer"));

    let err = run_err("var a = [1]; a[-1] = 2;");
    assert!(err.to_string().contains("non-negative integer"));

    let err = run_err("var a = 1; print a[0];");
    assert!(err.to_string().contains("Expected array, got 1"));

    let err = run_err("var a = []; a[9223372036854775807] = 1;");
    assert_eq!(
        err.to_string(),
        "RuntimeError: Array index 9223372036854775807 is out of range"
    );
    let err = run_err("var a = []; a[100000000000] = 1;");
    assert!(matches!(err, Error::RuntimeError(_)));
}

#[test]
fn test_array_survives_rejected_write() {
    let (mut engine, output) = engine();
    assert!(engine.eval("var a = [1]; a[100000000000] = 2;").is_err());
    assert_eq!(run_in(&mut engine, &output, "print a;"), "[1]\n");
    assert_eq!(
        run_in(&mut engine, &output, "a[1000] = 2; print a[1000];"),
        "2\n"
    );
}

#[test]
fn test_self_containing_array() {
    assert_eq!(run("var a = [1]; a[1] = a; print a;"), "[1, [...]]\n");
    assert_eq!(
        run("var a = [1]; a[1] = a; var b = [1]; b[1] = b; print a == b; print a == [1, 2];"),
        "true\nfalse\n"
    );
}

#[test]
fn test_for_in_iteration() {
    assert_eq!(
        run("var a = [3,4]; for (var i in a) { a[i] = a[i] * 2; } print(a[0] + a[1]);"),
        "14\n"
    );
}

#[test]
fn test_for_of_iteration() {
    assert_eq!(
        run(
            "var a = []; a[0] = 3; a[1] = 4; var sum = 0;
             for (var ea of a) { sum = sum + ea; }
             print(sum);"
        ),
        "7\n"
    );
}

#[test]
fn test_for_of_empty_array() {
    assert_eq!(run("for (var x of []) { print x; } print \"done\";"), "done\n");
}

#[test]
fn test_for_of_continue_and_break() {
    assert_eq!(
        run(
            "for (var x of [1, 2, 3, 4, 5]) {
                 continue if (x == 2);
                 break if (x == 4);
                 print x;
             }"
        ),
        "1\n3\n"
    );
}

#[test]
fn test_for_in_body_cannot_derail_iteration() {
    assert_eq!(
        run("for (var i in [\"a\", \"b\", \"c\"]) { print i; i = 10; }"),
        "0\n1\n2\n"
    );
}

#[test]
fn test_for_each_reevaluates_iterable() {
    let prelude = "var count = 0; fun arr() { count = count + 1; return [1, 2]; }";
    assert_eq!(
        run(&format!("{} for (var x of arr()) {{}} print count;", prelude)),
        "5\n"
    );
    assert_eq!(
        run(&format!("{} for (var i in arr()) {{}} print count;", prelude)),
        "3\n"
    );
}

#[test]
fn test_for_each_over_non_array() {
    let err = run_err("for (var x of 5) {}");
    assert!(err.to_string().contains("Expected array, got 5"));
}

// Numbers

#[test]
fn test_big_numbers() {
    assert_eq!(run("print 9223372036854775808;"), "9223372036854775808\n");
    assert_eq!(
        run("print 9223372036854775807+9223372036854775807;"),
        "18446744073709551614\n"
    );
    assert_eq!(
        run("print 9223372036854775808+9223372036854775808;"),
        "18446744073709551616\n"
    );
    assert_eq!(run("print 9223372036854775807*2;"), "18446744073709551614\n");
    assert_eq!(
        run("print 9223372036854775807*9223372036854775807;"),
        "85070591730234615847396907784232501249\n"
    );
    assert_eq!(
        run("print -9223372036854775808-9223372036854775807;"),
        "-18446744073709551615\n"
    );
    assert_eq!(run("print 9223372036854775808/2;"), "4611686018427387904\n");
    assert_eq!(
        run("print (9223372036854775807 + 1) * 2;"),
        "18446744073709551616\n"
    );
    assert_eq!(run("print -9223372036854775809;"), "-9223372036854775809\n");
}

#[test]
fn test_big_number_comparisons() {
    assert_eq!(run("print 9223372036854775808 == 9223372036854775808;"), "true\n");
    assert_eq!(run("print 9223372036854775807 != 9223372036854775808;"), "true\n");
    assert_eq!(run("print 9223372036854775808 > 9223372036854775807;"), "true\n");
    assert_eq!(run("print 9223372036854775807 < 9223372036854775808;"), "true\n");
    assert_eq!(run("print 9223372036854775808 - 1 == 9223372036854775807;"), "true\n");
}

#[test]
fn test_modulo() {
    assert_eq!(run("print 10 % 3;"), "1\n");
    assert_eq!(run("print 10 % 2;"), "0\n");
    assert_eq!(run("print -10 % 3;"), "-1\n");
    assert_eq!(run("print 10 % -3;"), "1\n");
    assert_eq!(run("print -10 % -3;"), "-1\n");
    assert_eq!(run("print 9223372036854775808 % 3;"), "2\n");
    assert_eq!(run("print 18446744073709551616 % 9223372036854775808;"), "0\n");
}

#[test]
fn test_float_display() {
    assert_eq!(run("print 1.0;"), "1.0\n");
    assert_eq!(run("print 0.1 + 0.2;"), "0.30000000000000004\n");
    assert_eq!(run("print 7 / 2;"), "3.5\n");
    assert_eq!(run("print 100000000000000000000.0;"), "100000000000000000000.0\n");
    assert_eq!(run("print 1.0 / 10000000.0;"), "0.0000001\n");
}

// Strings

#[test]
fn test_string_interpolation() {
    assert_eq!(run("print \"hello ${3 + 4}\";"), "hello 7\n");
    assert_eq!(
        run("print \"sum: ${2 + 3}, product: ${4 * 5}\";"),
        "sum: 5, product: 20\n"
    );
    assert_eq!(run("var x = 10; print \"x is ${x}\";"), "x is 10\n");
    assert_eq!(
        run("fun add(a, b) { return a + b; } print \"result: ${add(2, 3)}\";"),
        "result: 5\n"
    );
    assert_eq!(run("print \"${nil}\";"), "nil\n");
}

#[test]
fn test_interpolation_sees_locals() {
    assert_eq!(
        run("fun greet(name) { return \"hi ${name}!\"; } print greet(\"lox\");"),
        "hi lox!\n"
    );
}

#[test]
fn test_string_escapes() {
    assert_eq!(run("print \"a\\tb\";"), "a\tb\n");
    assert_eq!(run("print \"say \\\"hi\\\"\";"), "say \"hi\"\n");
}

// Errors

#[test]
fn test_syntax_errors() {
    assert!(matches!(run_err("print 1"), Error::SyntaxError { .. }));
    assert!(matches!(run_err("var = 1;"), Error::SyntaxError { .. }));
    assert!(matches!(run_err("1 = 2;"), Error::SyntaxError { .. }));
    assert!(matches!(run_err("\"unterminated"), Error::SyntaxError { .. }));
}

#[test]
fn test_parse_errors_run_nothing() {
    let (mut engine, output) = engine();
    assert!(engine.eval("print 1; print 2").is_err());
    assert_eq!(output.contents(), "");
}

#[test]
fn test_runtime_error_keeps_earlier_output() {
    let (mut engine, output) = engine();
    assert!(engine.eval("print 1; print nil + 1; print 2;").is_err());
    assert_eq!(output.contents(), "1\n");
}
