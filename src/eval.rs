// ABOUTME: Evaluator — dispatches special forms and procedure application
// over the heap-backed value graph. No tail-call optimization: deep
// recursion grows the host stack and can legitimately overflow.

use crate::env;
use crate::error::LispError;
use crate::heap::{HeapRef, ParamSpec, Procedure, ProcedureKind};
use crate::runtime::Runtime;
use crate::symbol::SymbolId;
use crate::value::Value;

/// Rooted for the full duration of evaluating `value` against `env_ref`, so
/// an environment created moments ago by a caller survives any collection
/// triggered while still part of the live call chain.
pub fn eval(rt: &mut Runtime, env_ref: HeapRef, value: Value) -> Result<Value, LispError> {
    rt.push_env_frame(env_ref);
    let result = eval_inner(rt, env_ref, value);
    rt.pop_env_frame();
    result
}

fn eval_inner(rt: &mut Runtime, env_ref: HeapRef, value: Value) -> Result<Value, LispError> {
    match value {
        Value::Symbol(sym) => {
            let name = rt.symbol_name(sym).to_string();
            env::lookup(&rt.heap, env_ref, sym, &name)
        }
        Value::Pair(r) => eval_call(rt, env_ref, r),
        Value::Exception => Err(LispError::Internal(
            "attempted to evaluate the Exception sentinel".into(),
        )),
        other => Ok(other),
    }
}

fn list_to_vec(rt: &Runtime, mut value: Value) -> Result<Vec<Value>, LispError> {
    let mut items = Vec::new();
    loop {
        match value {
            Value::Nil => return Ok(items),
            Value::Pair(r) => {
                let (car, cdr) = rt.heap.pair(r)?;
                items.push(car);
                value = cdr;
            }
            _ => return Err(LispError::Internal("expected a proper list".into())),
        }
    }
}

fn vec_to_list(rt: &mut Runtime, items: &[Value]) -> Value {
    let mut result = Value::Nil;
    for item in items.iter().rev() {
        result = Value::Pair(rt.heap.alloc_pair(*item, result));
    }
    result
}

fn symbol_name_of(rt: &Runtime, head: HeapRef) -> Option<&'static str> {
    let (car, _) = rt.heap.pair(head).ok()?;
    if let Value::Symbol(sym) = car {
        Some(match rt.symbol_name(sym) {
            "QUOTE" => "QUOTE",
            "IF" => "IF",
            "COND" => "COND",
            "DEFINE" => "DEFINE",
            "SET!" => "SET!",
            "LAMBDA" => "LAMBDA",
            "NAMED-LAMBDA" => "NAMED-LAMBDA",
            "LET" => "LET",
            "LET*" => "LET*",
            "LETREC" => "LETREC",
            "BEGIN" => "BEGIN",
            _ => return None,
        })
    } else {
        None
    }
}

fn eval_call(rt: &mut Runtime, env_ref: HeapRef, form: HeapRef) -> Result<Value, LispError> {
    // Every heap allocation (cons, vectors, new environments, closures) is
    // the direct or indirect result of evaluating some call form, so this
    // is the natural checkpoint for the collector's adaptive threshold.
    rt.maybe_collect();

    let (head, rest) = rt.heap.pair(form)?;

    if let Some(special) = symbol_name_of(rt, form) {
        return eval_special_form(rt, env_ref, special, rest);
    }

    let arg_forms = list_to_vec(rt, rest)?;

    let callee = eval(rt, env_ref, head)?;
    rt.root(callee);

    // Each arg is rooted the instant it's evaluated: evaluating a later arg
    // can itself trigger a collection, and an already-computed earlier arg
    // sitting only in this Vec isn't reachable from any existing root.
    let mut args = Vec::with_capacity(arg_forms.len());
    for form in arg_forms {
        match eval(rt, env_ref, form) {
            Ok(value) => {
                rt.root(value);
                args.push(value);
            }
            Err(e) => {
                rt.unroot(args.len() + 1);
                return Err(e);
            }
        }
    }

    let result = apply(rt, callee, &args);
    rt.unroot(args.len() + 1);
    result
}

/// Invokes `callee` on already-evaluated `args`; shared by call-form
/// evaluation and the native `apply`/`eval` builtins.
pub fn apply(rt: &mut Runtime, callee: Value, args: &[Value]) -> Result<Value, LispError> {
    let proc_ref = match callee {
        Value::Procedure(r) => r,
        other => {
            return Err(LispError::type_error("apply", "procedure", other, 0));
        }
    };

    let proc = rt.heap.procedure(proc_ref)?.clone();
    if !proc.params.arity_matches(args.len()) {
        return Err(LispError::arity_error(
            rt.symbol_name(proc.name),
            expected_arity_text(&proc.params),
            args.len(),
        ));
    }

    rt.root(callee);
    rt.root_many(args);
    let result = match proc.kind {
        ProcedureKind::Native { func, arg_max } => {
            if let Some(max) = arg_max {
                if args.len() > max {
                    rt.unroot(args.len() + 1);
                    return Err(LispError::arity_error(rt.symbol_name(proc.name), format!("at most {}", max), args.len()));
                }
            }
            func(rt, args)
        }
        ProcedureKind::Interpreted { env: captured } => {
            apply_interpreted(rt, captured, &proc, args)
        }
    };
    rt.unroot(args.len() + 1);
    result
}

fn expected_arity_text(params: &ParamSpec) -> String {
    match params {
        ParamSpec::Fixed(p) => p.len().to_string(),
        ParamSpec::Rest(_) => "any number of".to_string(),
        ParamSpec::Mixed(p, _) => format!("at least {}", p.len()),
    }
}

fn apply_interpreted(
    rt: &mut Runtime,
    captured: HeapRef,
    proc: &Procedure,
    args: &[Value],
) -> Result<Value, LispError> {
    let call_env = rt.heap.alloc_env("procedure-call", Some(captured));
    rt.push_env_frame(call_env);
    let result = bind_params(rt, call_env, &proc.params, args)
        .and_then(|()| eval_body(rt, call_env, &proc.body));
    rt.pop_env_frame();
    result
}

fn bind_params(
    rt: &mut Runtime,
    call_env: HeapRef,
    params: &ParamSpec,
    args: &[Value],
) -> Result<(), LispError> {
    match params {
        ParamSpec::Fixed(names) => {
            for (name, value) in names.iter().zip(args) {
                env::force_define(&mut rt.heap, call_env, *name, *value)?;
            }
        }
        ParamSpec::Rest(name) => {
            let list = vec_to_list(rt, args);
            env::force_define(&mut rt.heap, call_env, *name, list)?;
        }
        ParamSpec::Mixed(names, rest) => {
            for (name, value) in names.iter().zip(args) {
                env::force_define(&mut rt.heap, call_env, *name, *value)?;
            }
            let tail = vec_to_list(rt, &args[names.len()..]);
            env::force_define(&mut rt.heap, call_env, *rest, tail)?;
        }
    }
    Ok(())
}

fn eval_special_form(
    rt: &mut Runtime,
    env_ref: HeapRef,
    name: &str,
    args: Value,
) -> Result<Value, LispError> {
    match name {
        "QUOTE" => eval_quote(rt, args),
        "IF" => eval_if(rt, env_ref, args),
        "COND" => eval_cond(rt, env_ref, args),
        "DEFINE" => eval_define(rt, env_ref, args),
        "SET!" => eval_set(rt, env_ref, args),
        "LAMBDA" => eval_lambda(rt, env_ref, args, None),
        "NAMED-LAMBDA" => eval_named_lambda(rt, env_ref, args),
        "LET" => eval_let(rt, env_ref, args),
        "LET*" => eval_let_star(rt, env_ref, args),
        "LETREC" => eval_letrec(rt, env_ref, args),
        "BEGIN" => eval_begin(rt, env_ref, args),
        _ => unreachable!("symbol_name_of only returns recognized special forms"),
    }
}

fn eval_quote(rt: &Runtime, args: Value) -> Result<Value, LispError> {
    let items = list_to_vec(rt, args)?;
    match items.as_slice() {
        [v] => Ok(*v),
        _ => Err(LispError::arity_error("quote", "1", items.len())),
    }
}

fn eval_if(rt: &mut Runtime, env_ref: HeapRef, args: Value) -> Result<Value, LispError> {
    let items = list_to_vec(rt, args)?;
    if items.len() != 2 && items.len() != 3 {
        return Err(LispError::arity_error("if", "2 or 3", items.len()));
    }
    let cond = eval(rt, env_ref, items[0])?;
    if cond.is_truthy() {
        eval(rt, env_ref, items[1])
    } else if items.len() == 3 {
        eval(rt, env_ref, items[2])
    } else {
        Ok(Value::Nil)
    }
}

fn eval_cond(rt: &mut Runtime, env_ref: HeapRef, args: Value) -> Result<Value, LispError> {
    let clauses = list_to_vec(rt, args)?;
    if clauses.is_empty() {
        return Err(LispError::arity_error("cond", "at least 1 clause", 0));
    }
    let else_sym = rt.intern("ELSE");
    for clause in clauses {
        let parts = list_to_vec(rt, clause)?;
        let (test, body) = parts
            .split_first()
            .ok_or_else(|| LispError::Internal("cond clause must not be empty".into()))?;
        let matched = if matches!(test, Value::Symbol(s) if *s == else_sym) {
            true
        } else {
            eval(rt, env_ref, *test)?.is_truthy()
        };
        if matched {
            return eval_body(rt, env_ref, body);
        }
    }
    Ok(Value::Nil)
}

fn eval_body(rt: &mut Runtime, env_ref: HeapRef, body: &[Value]) -> Result<Value, LispError> {
    let mut result = Value::Nil;
    for form in body {
        result = eval(rt, env_ref, *form)?;
    }
    Ok(result)
}

fn as_symbol(rt: &Runtime, value: Value, context: &str) -> Result<SymbolId, LispError> {
    match value {
        Value::Symbol(s) => Ok(s),
        other => Err(LispError::type_error(context, "symbol", other, 0)),
    }
}

/// `(define symbol expr)` or `(define (name params...) body...)`, the
/// latter desugaring to `(define name (named-lambda (name params...) body...))`.
fn eval_define(rt: &mut Runtime, env_ref: HeapRef, args: Value) -> Result<Value, LispError> {
    let items = list_to_vec(rt, args)?;
    if items.len() < 2 {
        return Err(LispError::arity_error("define", "at least 2", items.len()));
    }

    let is_top_level = env_ref == rt.top_level || env_ref == rt.global;

    match items[0] {
        Value::Symbol(sym) => {
            if items.len() != 2 {
                return Err(LispError::arity_error("define", "2", items.len()));
            }
            let value = eval(rt, env_ref, items[1])?;
            let name = rt.symbol_name(sym).to_string();
            env::define(&mut rt.heap, env_ref, sym, &name, value, is_top_level)?;
        }
        Value::Pair(header) => {
            let (name_val, _params) = rt.heap.pair(header)?;
            let name = as_symbol(rt, name_val, "define")?;
            let mut body_tail = Value::Nil;
            for form in items[1..].iter().rev() {
                body_tail = Value::Pair(rt.heap.alloc_pair(*form, body_tail));
            }
            let lambda_args = Value::Pair(rt.heap.alloc_pair(items[0], body_tail));
            let proc = eval_named_lambda(rt, env_ref, lambda_args)?;
            let name_str = rt.symbol_name(name).to_string();
            env::define(&mut rt.heap, env_ref, name, &name_str, proc, is_top_level)?;
        }
        other => return Err(LispError::type_error("define", "symbol or pair", other, 0)),
    }
    Ok(Value::Nil)
}

fn eval_set(rt: &mut Runtime, env_ref: HeapRef, args: Value) -> Result<Value, LispError> {
    let items = list_to_vec(rt, args)?;
    if items.len() != 2 {
        return Err(LispError::arity_error("set!", "2", items.len()));
    }
    let sym = as_symbol(rt, items[0], "set!")?;
    let value = eval(rt, env_ref, items[1])?;
    let name = rt.symbol_name(sym).to_string();
    env::assign(&mut rt.heap, env_ref, sym, &name, value)?;
    Ok(Value::Nil)
}

fn parse_param_spec(rt: &Runtime, mut spec: Value) -> Result<ParamSpec, LispError> {
    if let Value::Symbol(rest) = spec {
        return Ok(ParamSpec::Rest(rest));
    }
    let mut fixed = Vec::new();
    loop {
        match spec {
            Value::Nil => return Ok(ParamSpec::Fixed(fixed)),
            Value::Pair(r) => {
                let (car, cdr) = rt.heap.pair(r)?;
                fixed.push(as_symbol(rt, car, "lambda parameter")?);
                spec = cdr;
            }
            Value::Symbol(rest) => return Ok(ParamSpec::Mixed(fixed, rest)),
            other => return Err(LispError::type_error("lambda", "parameter list", other, 0)),
        }
    }
}

fn eval_lambda(
    rt: &mut Runtime,
    env_ref: HeapRef,
    args: Value,
    name_override: Option<SymbolId>,
) -> Result<Value, LispError> {
    let items = list_to_vec(rt, args)?;
    if items.len() < 2 {
        return Err(LispError::arity_error("lambda", "at least 2", items.len()));
    }
    let params = parse_param_spec(rt, items[0])?;
    let body = items[1..].to_vec();
    let name = name_override.unwrap_or_else(|| rt.intern("LAMBDA"));
    let proc = Procedure {
        name,
        params,
        body,
        kind: ProcedureKind::Interpreted { env: env_ref },
    };
    let r = rt.heap.alloc_procedure(proc);
    Ok(Value::Procedure(r))
}

fn eval_named_lambda(rt: &mut Runtime, env_ref: HeapRef, args: Value) -> Result<Value, LispError> {
    let items = list_to_vec(rt, args)?;
    if items.len() < 2 {
        return Err(LispError::arity_error("named-lambda", "at least 2", items.len()));
    }
    let header = list_to_vec(rt, items[0])?;
    let (name_val, params) = header
        .split_first()
        .ok_or_else(|| LispError::Internal("named-lambda header must not be empty".into()))?;
    let name = as_symbol(rt, *name_val, "named-lambda")?;
    let params_value = vec_to_list(rt, params);

    let mut rest = Value::Nil;
    for form in items[1..].iter().rev() {
        rest = Value::Pair(rt.heap.alloc_pair(*form, rest));
    }
    let full_args = Value::Pair(rt.heap.alloc_pair(params_value, rest));
    eval_lambda(rt, env_ref, full_args, Some(name))
}

fn eval_let(rt: &mut Runtime, env_ref: HeapRef, args: Value) -> Result<Value, LispError> {
    let items = list_to_vec(rt, args)?;
    if items.len() < 2 {
        return Err(LispError::arity_error("let", "at least 2", items.len()));
    }
    let bindings = list_to_vec(rt, items[0])?;

    let mut names = Vec::with_capacity(bindings.len());
    let mut values = Vec::with_capacity(bindings.len());
    for binding in bindings {
        let pair = list_to_vec(rt, binding)?;
        let (name, expr) = match pair.as_slice() {
            [n, e] => (*n, *e),
            _ => return Err(LispError::Internal("let binding must be (name expr)".into())),
        };
        names.push(as_symbol(rt, name, "let")?);
        // Rooted immediately: none of these are reachable from any
        // environment until the loop below installs them, and evaluating a
        // later initializer can trigger a collection on its own.
        match eval(rt, env_ref, expr) {
            Ok(value) => {
                rt.root(value);
                values.push(value);
            }
            Err(e) => {
                rt.unroot(values.len());
                return Err(e);
            }
        }
    }

    let child = rt.heap.alloc_env("let", Some(env_ref));
    for (name, value) in names.iter().zip(values.iter()) {
        env::force_define(&mut rt.heap, child, *name, *value)?;
    }
    rt.unroot(values.len());
    eval_body(rt, child, &items[1..])
}

fn eval_let_star(rt: &mut Runtime, env_ref: HeapRef, args: Value) -> Result<Value, LispError> {
    let items = list_to_vec(rt, args)?;
    if items.len() < 2 {
        return Err(LispError::arity_error("let*", "at least 2", items.len()));
    }
    let bindings = list_to_vec(rt, items[0])?;

    let mut current = env_ref;
    for binding in bindings {
        let pair = list_to_vec(rt, binding)?;
        let (name, expr) = match pair.as_slice() {
            [n, e] => (*n, *e),
            _ => return Err(LispError::Internal("let* binding must be (name expr)".into())),
        };
        let sym = as_symbol(rt, name, "let*")?;
        let value = eval(rt, current, expr)?;
        let child = rt.heap.alloc_env("let*", Some(current));
        env::force_define(&mut rt.heap, child, sym, value)?;
        current = child;
    }
    eval_body(rt, current, &items[1..])
}

/// All bindings are pre-declared as Nil, then backfilled once every
/// initializer has run — `letrec`'s mutual-visibility requirement without
/// needing forward references to resolve mid-evaluation.
fn eval_letrec(rt: &mut Runtime, env_ref: HeapRef, args: Value) -> Result<Value, LispError> {
    let items = list_to_vec(rt, args)?;
    if items.len() < 2 {
        return Err(LispError::arity_error("letrec", "at least 2", items.len()));
    }
    let bindings = list_to_vec(rt, items[0])?;

    let child = rt.heap.alloc_env("letrec", Some(env_ref));
    let mut names = Vec::with_capacity(bindings.len());
    let mut exprs = Vec::with_capacity(bindings.len());
    for binding in &bindings {
        let pair = list_to_vec(rt, *binding)?;
        let (name, expr) = match pair.as_slice() {
            [n, e] => (*n, *e),
            _ => return Err(LispError::Internal("letrec binding must be (name expr)".into())),
        };
        let sym = as_symbol(rt, name, "letrec")?;
        env::force_define(&mut rt.heap, child, sym, Value::Nil)?;
        names.push(sym);
        exprs.push(expr);
    }
    for (sym, expr) in names.iter().zip(exprs) {
        let value = eval(rt, child, expr)?;
        rt.root(value);
        env::force_define(&mut rt.heap, child, *sym, value)?;
        rt.unroot(1);
    }
    eval_body(rt, child, &items[1..])
}

fn eval_begin(rt: &mut Runtime, env_ref: HeapRef, args: Value) -> Result<Value, LispError> {
    let items = list_to_vec(rt, args)?;
    eval_body(rt, env_ref, &items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::{ReadResult, Reader};

    fn eval_str(rt: &mut Runtime, src: &str) -> Result<Value, LispError> {
        let form = {
            let mut reader = Reader::new(src, rt);
            match reader.read_form().unwrap() {
                ReadResult::Form(v) => v,
                ReadResult::Eof => panic!("no form in {:?}", src),
            }
        };
        let top = rt.top_level;
        eval(rt, top, form)
    }

    #[test]
    fn self_evaluating_atoms() {
        let mut rt = Runtime::new();
        assert_eq!(eval_str(&mut rt, "42").unwrap(), Value::Int(42));
        assert_eq!(eval_str(&mut rt, "#t").unwrap(), Value::Bool(true));
    }

    #[test]
    fn quote_returns_unevaluated_form() {
        let mut rt = Runtime::new();
        let v = eval_str(&mut rt, "'(1 2)").unwrap();
        assert_eq!(crate::printer::display(&rt, v).unwrap(), "(1 2)");
    }

    #[test]
    fn if_picks_a_branch() {
        let mut rt = Runtime::new();
        assert_eq!(eval_str(&mut rt, "(if #t 1 2)").unwrap(), Value::Int(1));
        assert_eq!(eval_str(&mut rt, "(if #f 1 2)").unwrap(), Value::Int(2));
        assert_eq!(eval_str(&mut rt, "(if #f 1)").unwrap(), Value::Nil);
    }

    #[test]
    fn define_then_lookup_via_eval() {
        let mut rt = Runtime::new();
        eval_str(&mut rt, "(define x 10)").unwrap();
        assert_eq!(eval_str(&mut rt, "x").unwrap(), Value::Int(10));
    }

    #[test]
    fn procedure_sugar_defines_a_callable() {
        let mut rt = Runtime::new();
        eval_str(&mut rt, "(define (sq x) (* x x))").unwrap();
        assert_eq!(eval_str(&mut rt, "(sq 7)").unwrap(), Value::Int(49));
    }

    #[test]
    fn closures_capture_their_defining_environment() {
        let mut rt = Runtime::new();
        eval_str(&mut rt, "(define (adder x) (lambda (y) x))").unwrap();
        eval_str(&mut rt, "(define a (adder 10))").unwrap();
        assert_eq!(eval_str(&mut rt, "(a 999)").unwrap(), Value::Int(10));
    }

    #[test]
    fn letrec_sees_mutual_bindings() {
        let mut rt = Runtime::new();
        let v = eval_str(
            &mut rt,
            "(letrec ((e? (lambda (n) (if (= n 0) #t (o? (- n 1))))) \
              (o? (lambda (n) (if (= n 0) #f (e? (- n 1)))))) (e? 10))",
        );
        assert_eq!(v.unwrap(), Value::Bool(true));
    }

    #[test]
    fn set_requires_existing_binding() {
        let mut rt = Runtime::new();
        assert!(matches!(
            eval_str(&mut rt, "(set! nope 1)"),
            Err(LispError::UnboundVariable(_))
        ));
        eval_str(&mut rt, "(define y 1)").unwrap();
        eval_str(&mut rt, "(set! y 2)").unwrap();
        assert_eq!(eval_str(&mut rt, "y").unwrap(), Value::Int(2));
    }

    #[test]
    fn begin_returns_last_value() {
        let mut rt = Runtime::new();
        assert_eq!(
            eval_str(&mut rt, "(begin 1 2 3)").unwrap(),
            Value::Int(3)
        );
    }
}
