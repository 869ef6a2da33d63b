// ABOUTME: End-to-end tests driving the reader, evaluator, and printer together

use pebble_lisp::reader::{self, ReadResult, Reader};
use pebble_lisp::runtime::Runtime;
use pebble_lisp::value::Value;
use pebble_lisp::{eval, printer};

fn run(rt: &mut Runtime, src: &str) -> Value {
    let forms = reader::read_all(src, rt).expect("parse error");
    let top = rt.top_level;
    let mut result = Value::Nil;
    for form in forms {
        result = eval::eval(rt, top, form).expect("evaluation error");
    }
    result
}

/// Evaluates every top-level form in `src`, returning the printed rendering
/// of the argument to the last `(display ...)` call — what the scenarios in
/// this file assert on, since `display`'s own return value is always Nil.
fn run_and_capture_last_display(rt: &mut Runtime, src: &str) -> String {
    let forms = reader::read_all(src, rt).expect("parse error");
    let top = rt.top_level;
    let mut last = None;
    for form in forms {
        if let Value::Pair(r) = form {
            let (head, rest) = rt.heap.pair(r).unwrap();
            if let Value::Symbol(s) = head {
                if rt.symbol_name(s) == "DISPLAY" {
                    let arg_pair = match rest {
                        Value::Pair(p) => p,
                        _ => unreachable!("display always has one argument"),
                    };
                    let (arg, _) = rt.heap.pair(arg_pair).unwrap();
                    let v = eval::eval(rt, top, arg).expect("evaluation error");
                    last = Some(printer::display(rt, v).expect("print error"));
                    continue;
                }
            }
        }
        eval::eval(rt, top, form).expect("evaluation error");
    }
    last.expect("scenario must contain a (display ...) call")
}

#[test]
fn scenario_naive_fibonacci() {
    let mut rt = Runtime::new();
    let out = run_and_capture_last_display(
        &mut rt,
        "(define (fib n) (if (< n 2) n (+ (fib (- n 1)) (fib (- n 2)))))
         (display (fib 10))",
    );
    assert_eq!(out, "55");
}

#[test]
fn scenario_iterative_fibonacci_with_internal_define() {
    let mut rt = Runtime::new();
    let out = run_and_capture_last_display(
        &mut rt,
        "(define (fib-1 n)
           (define (fib-iter cur last i n)
             (if (!= i n) (fib-iter (+ cur last) cur (+ 1 i) n) cur))
           (fib-iter 1 0 1 n))
         (display (fib-1 25))",
    );
    assert_eq!(out, "75025");
}

#[test]
fn scenario_closure_capture() {
    let mut rt = Runtime::new();
    let out = run_and_capture_last_display(
        &mut rt,
        "(define adder (lambda (x) (lambda (y) (+ x y))))
         (display ((adder 10) 32))",
    );
    assert_eq!(out, "42");
}

#[test]
fn scenario_dotted_pair_round_trip() {
    let mut rt = Runtime::new();
    let out = run_and_capture_last_display(&mut rt, "(display '(a . b))");
    assert_eq!(out, "(A . B)");
}

#[test]
fn scenario_letrec_mutual_visibility() {
    let mut rt = Runtime::new();
    let out = run_and_capture_last_display(
        &mut rt,
        "(letrec ((even? (lambda (n) (if (= n 0) #t (odd? (- n 1)))))
                  (odd?  (lambda (n) (if (= n 0) #f (even? (- n 1))))))
           (display (even? 10)))",
    );
    assert_eq!(out, "#T");
}

#[test]
fn scenario_cycle_reclamation() {
    let mut rt = Runtime::new();
    run(
        &mut rt,
        "(define (leak) (let ((p (cons 1 2))) (set! p (cons p p)) p))",
    );
    run(&mut rt, "(leak) (leak) (leak)");
    rt.collect();
    let after = rt.heap.live_count();
    // Three self-referential pairs, each built from two allocations, plus
    // the top-level/global environments themselves: a working collector
    // must not let the leaked cycles accumulate beyond a handful of slots.
    assert!(after <= 8, "live count after gc was {after}");
}

#[test]
fn symbols_are_interned_by_identity() {
    let mut rt = Runtime::new();
    let result = run(&mut rt, "(eq? (quote foo) (quote foo))");
    assert_eq!(result, Value::Bool(true));
}

#[test]
fn cons_then_car_and_cdr_round_trip() {
    let mut rt = Runtime::new();
    assert_eq!(run(&mut rt, "(car (cons 1 2))"), Value::Int(1));
    assert_eq!(run(&mut rt, "(cdr (cons 1 2))"), Value::Int(2));
}

#[test]
fn vector_fill_length_and_ref_agree() {
    let mut rt = Runtime::new();
    assert_eq!(run(&mut rt, "(vector-length (make-vector 5 9))"), Value::Int(5));
    for i in 0..5 {
        assert_eq!(
            run(&mut rt, &format!("(vector-ref (make-vector 5 9) {i})")),
            Value::Int(9)
        );
    }
}

#[test]
fn case_folding_unifies_bindings() {
    let mut rt = Runtime::new();
    run(&mut rt, "(define ABC 1)");
    assert_eq!(run(&mut rt, "abc"), Value::Int(1));
}

#[test]
fn set_never_creates_a_new_binding() {
    let mut rt = Runtime::new();
    let forms = reader::read_all("(set! nope 1)", &mut rt).unwrap();
    let top = rt.top_level;
    assert!(eval::eval(&mut rt, top, forms[0]).is_err());
}

#[test]
fn division_and_modulo_by_zero_are_type_errors() {
    let mut rt = Runtime::new();
    let forms = reader::read_all("(/ 1 0)", &mut rt).unwrap();
    let top = rt.top_level;
    assert!(eval::eval(&mut rt, top, forms[0]).is_err());
}

#[test]
fn out_of_range_vector_ref_is_a_range_error() {
    let mut rt = Runtime::new();
    run(&mut rt, "(define v (make-vector 3 0))");
    let forms = reader::read_all("(vector-ref v 10)", &mut rt).unwrap();
    let top = rt.top_level;
    assert!(eval::eval(&mut rt, top, forms[0]).is_err());
}

#[test]
fn repl_style_eval_lowers_errors_to_the_exception_sentinel() {
    let mut rt = Runtime::new();
    let form = {
        let mut reader = Reader::new("(car 1)", &mut rt);
        match reader.read_form().unwrap() {
            ReadResult::Form(v) => v,
            ReadResult::Eof => panic!("expected a form"),
        }
    };
    let top = rt.top_level;
    assert_eq!(rt.eval(top, form), Value::Exception);
    assert!(rt.get_exception().is_some());
}
