//! Speculative resolution of dynamic load calls.
//!
//! A dynamic `require(expr)` is often preceded by enough context (a
//! variable assignment, a small conditional, a directory scan) that
//! replaying a nearby fragment of the file with a stubbed loader
//! reveals the concrete argument. Each enclosing node of the call is
//! re-parsed and executed, nearest first, in a fresh evaluation
//! context; the first fragment whose execution calls the loader with a
//! file-style string wins.
//!
//! The evaluator is a restricted interpreter over the Tree-sitter
//! parse rather than a full embedded engine: declarations, string
//! arithmetic, comparisons, conditionals, inline callbacks and stubbed
//! `fs`/`path` hosts cover the shapes dynamic loads take in practice.
//! Anything outside that aborts the current fragment only; resolution
//! failure is never an error.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use path_clean::PathClean;
use tracing::debug;
use tree_sitter::{Node, Parser};

use super::finder::{FoundCall, ANCESTRY_LIMIT};
use super::parser::{decode_string_literal, node_text};
use super::resolve::is_core_reference;

/// Call-nesting ceiling inside one speculative execution.
const MAX_CALL_DEPTH: usize = 32;

pub struct DynamicResolver {
    loader: String,
}

impl DynamicResolver {
    pub fn new(loader: &str) -> Self {
        Self {
            loader: loader.to_string(),
        }
    }

    /// Try to observe which names the loader would be invoked with at
    /// runtime. Returns `None` when no candidate fragment captures
    /// anything; the caller degrades to an unresolved leaf.
    pub fn resolve(&self, file: &Path, found: &FoundCall) -> Option<Vec<String>> {
        for (index, candidate) in found.ancestry.iter().take(ANCESTRY_LIMIT).enumerate() {
            let captured = self.attempt(file, candidate);
            if !captured.is_empty() {
                debug!(
                    candidate = index,
                    captures = captured.len(),
                    "speculative execution captured load names"
                );
                return Some(captured);
            }
        }
        None
    }

    /// Execute one candidate fragment in a disposable context.
    /// Captures made before an execution error still count.
    fn attempt(&self, file: &Path, fragment: &str) -> Vec<String> {
        let mut parser = Parser::new();
        if parser
            .set_language(&tree_sitter_javascript::language())
            .is_err()
        {
            return Vec::new();
        }
        let Some(tree) = parser.parse(fragment, None) else {
            return Vec::new();
        };
        if tree.root_node().has_error() {
            return Vec::new();
        }

        let mut vm = SpeculativeVm::new(&self.loader, file, fragment);
        vm.run(tree.root_node());
        vm.captured
    }
}

#[derive(Clone, Debug)]
enum Value<'t> {
    Undefined,
    Bool(bool),
    Num(f64),
    Str(String),
    List(Vec<Value<'t>>),
    /// Inert object stub (`process`, `module`, `exports`, literals).
    Object,
    /// The `fs` host stub.
    Fs,
    /// The `path` host stub.
    PathHost,
    /// The capturing loader stub.
    Loader,
    /// A user function; the node is its definition.
    Func(Node<'t>),
}

/// Aborts the current fragment. The reason is only for debug logging.
struct EvalStop(&'static str);

enum Flow<'t> {
    Normal,
    Return(Value<'t>),
}

type Eval<'t> = std::result::Result<Value<'t>, EvalStop>;

struct SpeculativeVm<'t> {
    loader: &'t str,
    source: &'t str,
    dirname: PathBuf,
    scopes: Vec<HashMap<String, Value<'t>>>,
    captured: Vec<String>,
    call_depth: usize,
}

impl<'t> SpeculativeVm<'t> {
    fn new(loader: &'t str, file: &Path, source: &'t str) -> Self {
        let dirname = file.parent().unwrap_or(Path::new("/")).to_path_buf();

        let mut globals = HashMap::new();
        globals.insert(
            "__filename".to_string(),
            Value::Str(file.display().to_string()),
        );
        globals.insert(
            "__dirname".to_string(),
            Value::Str(dirname.display().to_string()),
        );
        globals.insert("process".to_string(), Value::Object);
        globals.insert("module".to_string(), Value::Object);
        globals.insert("exports".to_string(), Value::Object);
        globals.insert("fs".to_string(), Value::Fs);
        globals.insert("path".to_string(), Value::PathHost);
        globals.insert(loader.to_string(), Value::Loader);

        Self {
            loader,
            source,
            dirname,
            scopes: vec![globals],
            captured: Vec::new(),
            call_depth: 0,
        }
    }

    fn run(&mut self, root: Node<'t>) {
        let mut cursor = root.walk();
        let statements: Vec<_> = root.named_children(&mut cursor).collect();
        for statement in statements {
            match self.exec_statement(statement) {
                Ok(Flow::Normal) => {}
                Ok(Flow::Return(_)) => break,
                Err(EvalStop(reason)) => {
                    debug!(reason, "speculative fragment aborted");
                    break;
                }
            }
        }
    }

    fn exec_statement(&mut self, node: Node<'t>) -> std::result::Result<Flow<'t>, EvalStop> {
        match node.kind() {
            "variable_declaration" | "lexical_declaration" => {
                let mut cursor = node.walk();
                let declarators: Vec<_> = node
                    .named_children(&mut cursor)
                    .filter(|c| c.kind() == "variable_declarator")
                    .collect();
                for declarator in declarators {
                    let name = declarator
                        .child_by_field_name("name")
                        .ok_or(EvalStop("declarator without name"))?;
                    if name.kind() != "identifier" {
                        return Err(EvalStop("destructuring declaration"));
                    }
                    let value = match declarator.child_by_field_name("value") {
                        Some(v) => self.eval(v)?,
                        None => Value::Undefined,
                    };
                    self.declare(node_text(name, self.source), value);
                }
                Ok(Flow::Normal)
            }
            "expression_statement" => {
                if let Some(expression) = node.named_child(0) {
                    self.eval(expression)?;
                }
                Ok(Flow::Normal)
            }
            "statement_block" => {
                let mut cursor = node.walk();
                let statements: Vec<_> = node.named_children(&mut cursor).collect();
                for statement in statements {
                    if let Flow::Return(v) = self.exec_statement(statement)? {
                        return Ok(Flow::Return(v));
                    }
                }
                Ok(Flow::Normal)
            }
            "if_statement" => {
                let condition = node
                    .child_by_field_name("condition")
                    .ok_or(EvalStop("if without condition"))?;
                if truthy(&self.eval(condition)?) {
                    let consequence = node
                        .child_by_field_name("consequence")
                        .ok_or(EvalStop("if without consequence"))?;
                    self.exec_statement(consequence)
                } else if let Some(alternative) = node.child_by_field_name("alternative") {
                    // alternative is an else_clause wrapping the statement
                    match alternative.named_child(0) {
                        Some(statement) => self.exec_statement(statement),
                        None => Ok(Flow::Normal),
                    }
                } else {
                    Ok(Flow::Normal)
                }
            }
            "return_statement" => {
                let value = match node.named_child(0) {
                    Some(expression) => self.eval(expression)?,
                    None => Value::Undefined,
                };
                Ok(Flow::Return(value))
            }
            "function_declaration" => {
                if let Some(name) = node.child_by_field_name("name") {
                    self.declare(node_text(name, self.source), Value::Func(node));
                }
                Ok(Flow::Normal)
            }
            "empty_statement" | "comment" | "hash_bang_line" => Ok(Flow::Normal),
            _ => Err(EvalStop("unsupported statement")),
        }
    }

    fn eval(&mut self, node: Node<'t>) -> Eval<'t> {
        match node.kind() {
            "string" => Ok(Value::Str(decode_string_literal(node, self.source))),
            "template_string" => self.eval_template(node),
            "number" => node_text(node, self.source)
                .parse::<f64>()
                .map(Value::Num)
                .map_err(|_| EvalStop("unsupported number literal")),
            "true" => Ok(Value::Bool(true)),
            "false" => Ok(Value::Bool(false)),
            "null" | "undefined" => Ok(Value::Undefined),
            "identifier" => self
                .lookup(node_text(node, self.source))
                .ok_or(EvalStop("reference error")),
            "parenthesized_expression" => {
                let inner = node.named_child(0).ok_or(EvalStop("empty parens"))?;
                self.eval(inner)
            }
            "binary_expression" => self.eval_binary(node),
            "unary_expression" => self.eval_unary(node),
            "ternary_expression" => {
                let condition = node
                    .child_by_field_name("condition")
                    .ok_or(EvalStop("ternary without condition"))?;
                let branch = if truthy(&self.eval(condition)?) {
                    node.child_by_field_name("consequence")
                } else {
                    node.child_by_field_name("alternative")
                };
                self.eval(branch.ok_or(EvalStop("ternary without branch"))?)
            }
            "assignment_expression" => {
                let left = node
                    .child_by_field_name("left")
                    .ok_or(EvalStop("assignment without target"))?;
                let right = node
                    .child_by_field_name("right")
                    .ok_or(EvalStop("assignment without value"))?;
                let value = self.eval(right)?;
                if left.kind() == "identifier" {
                    self.assign(node_text(left, self.source), value.clone());
                }
                // stores through members (module.exports = ...) are inert
                Ok(value)
            }
            "sequence_expression" => {
                let mut cursor = node.walk();
                let parts: Vec<_> = node.named_children(&mut cursor).collect();
                let mut last = Value::Undefined;
                for part in parts {
                    last = self.eval(part)?;
                }
                Ok(last)
            }
            "call_expression" => self.eval_call(node),
            "member_expression" => {
                let object = node
                    .child_by_field_name("object")
                    .ok_or(EvalStop("member without object"))?;
                let property = node
                    .child_by_field_name("property")
                    .ok_or(EvalStop("member without property"))?;
                let value = self.eval(object)?;
                member_value(&value, node_text(property, self.source))
            }
            "subscript_expression" => {
                let object = node
                    .child_by_field_name("object")
                    .ok_or(EvalStop("subscript without object"))?;
                let index = node
                    .child_by_field_name("index")
                    .ok_or(EvalStop("subscript without index"))?;
                let object = self.eval(object)?;
                let index = self.eval(index)?;
                match (object, index) {
                    (Value::List(items), Value::Num(n)) => {
                        Ok(items.get(n as usize).cloned().unwrap_or(Value::Undefined))
                    }
                    (Value::Undefined, _) => Err(EvalStop("subscript of undefined")),
                    _ => Ok(Value::Undefined),
                }
            }
            "array" => {
                let mut cursor = node.walk();
                let elements: Vec<_> = node
                    .named_children(&mut cursor)
                    .filter(|c| c.kind() != "comment")
                    .collect();
                let mut items = Vec::new();
                for element in elements {
                    items.push(self.eval(element)?);
                }
                Ok(Value::List(items))
            }
            "object" => Ok(Value::Object),
            "function_expression" | "arrow_function" | "generator_function" => {
                Ok(Value::Func(node))
            }
            _ => Err(EvalStop("unsupported expression")),
        }
    }

    fn eval_template(&mut self, node: Node<'t>) -> Eval<'t> {
        let mut value = String::new();
        let mut cursor = node.walk();
        let parts: Vec<_> = node.named_children(&mut cursor).collect();
        for part in parts {
            match part.kind() {
                "string_fragment" => value.push_str(node_text(part, self.source)),
                "escape_sequence" => value.push_str(node_text(part, self.source)),
                "template_substitution" => {
                    let inner = part.named_child(0).ok_or(EvalStop("empty substitution"))?;
                    let inner = self.eval(inner)?;
                    value.push_str(&js_display(&inner)?);
                }
                _ => {}
            }
        }
        Ok(Value::Str(value))
    }

    fn eval_binary(&mut self, node: Node<'t>) -> Eval<'t> {
        let left = node
            .child_by_field_name("left")
            .ok_or(EvalStop("binary without left"))?;
        let operator = node
            .child_by_field_name("operator")
            .ok_or(EvalStop("binary without operator"))?;
        let right = node
            .child_by_field_name("right")
            .ok_or(EvalStop("binary without right"))?;
        let operator = node_text(operator, self.source);

        let lhs = self.eval(left)?;

        // short-circuit forms return an operand, not a boolean
        match operator {
            "&&" => {
                return if truthy(&lhs) { self.eval(right) } else { Ok(lhs) };
            }
            "||" => {
                return if truthy(&lhs) { Ok(lhs) } else { self.eval(right) };
            }
            _ => {}
        }

        let rhs = self.eval(right)?;
        match operator {
            "+" => match (&lhs, &rhs) {
                (Value::Num(a), Value::Num(b)) => Ok(Value::Num(a + b)),
                _ => Ok(Value::Str(format!(
                    "{}{}",
                    js_display(&lhs)?,
                    js_display(&rhs)?
                ))),
            },
            "-" | "*" | "/" | "%" => match (&lhs, &rhs) {
                (Value::Num(a), Value::Num(b)) => Ok(Value::Num(match operator {
                    "-" => a - b,
                    "*" => a * b,
                    "/" => a / b,
                    _ => a % b,
                })),
                _ => Err(EvalStop("arithmetic on non-numbers")),
            },
            "===" | "==" => Ok(Value::Bool(loosely_equal(&lhs, &rhs))),
            "!==" | "!=" => Ok(Value::Bool(!loosely_equal(&lhs, &rhs))),
            "<" | "<=" | ">" | ">=" => compare(&lhs, &rhs, operator),
            _ => Err(EvalStop("unsupported operator")),
        }
    }

    fn eval_unary(&mut self, node: Node<'t>) -> Eval<'t> {
        let operator = node
            .child_by_field_name("operator")
            .ok_or(EvalStop("unary without operator"))?;
        let argument = node
            .child_by_field_name("argument")
            .ok_or(EvalStop("unary without argument"))?;

        match node_text(operator, self.source) {
            "!" => {
                let value = self.eval(argument)?;
                Ok(Value::Bool(!truthy(&value)))
            }
            "-" => match self.eval(argument)? {
                Value::Num(n) => Ok(Value::Num(-n)),
                _ => Err(EvalStop("negation of non-number")),
            },
            "typeof" => {
                // typeof on a missing binding is "undefined", not an error
                if argument.kind() == "identifier"
                    && self.lookup(node_text(argument, self.source)).is_none()
                {
                    return Ok(Value::Str("undefined".to_string()));
                }
                let value = self.eval(argument)?;
                Ok(Value::Str(typeof_name(&value).to_string()))
            }
            _ => Err(EvalStop("unsupported unary operator")),
        }
    }

    fn eval_call(&mut self, node: Node<'t>) -> Eval<'t> {
        let callee = node
            .child_by_field_name("function")
            .ok_or(EvalStop("call without callee"))?;
        let arguments = node
            .child_by_field_name("arguments")
            .ok_or(EvalStop("call without arguments"))?;
        if arguments.kind() != "arguments" {
            return Err(EvalStop("tagged template call"));
        }

        let mut cursor = arguments.walk();
        let argument_nodes: Vec<_> = arguments
            .named_children(&mut cursor)
            .filter(|c| c.kind() != "comment")
            .collect();
        let mut args = Vec::new();
        for argument in argument_nodes {
            args.push(self.eval(argument)?);
        }

        if callee.kind() == "member_expression" {
            let object = callee
                .child_by_field_name("object")
                .ok_or(EvalStop("member without object"))?;
            let property = callee
                .child_by_field_name("property")
                .ok_or(EvalStop("member without property"))?;
            let object = self.eval(object)?;
            let method = node_text(property, self.source);
            return self.call_method(object, method, args);
        }

        match self.eval(callee)? {
            Value::Loader => {
                if let Some(Value::Str(name)) = args.first() {
                    if !is_core_reference(name) {
                        self.captured.push(name.clone());
                    }
                }
                Ok(Value::Undefined)
            }
            Value::Func(definition) => self.call_function(definition, args),
            _ => Err(EvalStop("value is not callable")),
        }
    }

    fn call_method(
        &mut self,
        object: Value<'t>,
        method: &str,
        args: Vec<Value<'t>>,
    ) -> Eval<'t> {
        match object {
            Value::PathHost => self.path_method(method, args),
            Value::Fs => self.fs_method(method, args),
            Value::List(items) => self.list_method(items, method, args),
            Value::Str(s) => string_method(&s, method, args),
            Value::Undefined => Err(EvalStop("method call on undefined")),
            _ => Err(EvalStop("unsupported method receiver")),
        }
    }

    fn path_method(&mut self, method: &str, args: Vec<Value<'t>>) -> Eval<'t> {
        match method {
            "resolve" => {
                let mut acc = PathBuf::new();
                for arg in &args {
                    let part = as_str(arg)?;
                    let part = Path::new(part);
                    if part.is_absolute() {
                        acc = part.to_path_buf();
                    } else {
                        acc.push(part);
                    }
                }
                if acc.is_relative() {
                    acc = self.dirname.join(acc);
                }
                Ok(Value::Str(acc.clean().display().to_string()))
            }
            "join" => {
                let mut acc = PathBuf::new();
                for arg in &args {
                    acc.push(as_str(arg)?);
                }
                Ok(Value::Str(acc.clean().display().to_string()))
            }
            "dirname" => {
                let parent = Path::new(as_str(args.first().ok_or(EvalStop("missing argument"))?)?)
                    .parent()
                    .map(|p| p.display().to_string())
                    .unwrap_or_default();
                Ok(Value::Str(if parent.is_empty() {
                    ".".to_string()
                } else {
                    parent
                }))
            }
            "extname" => {
                let path = as_str(args.first().ok_or(EvalStop("missing argument"))?)?;
                let extension = super::resolve::extension_of(Path::new(path));
                Ok(Value::Str(if extension.is_empty() {
                    String::new()
                } else {
                    format!(".{extension}")
                }))
            }
            "basename" => {
                let path = as_str(args.first().ok_or(EvalStop("missing argument"))?)?;
                let name = Path::new(path)
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                Ok(Value::Str(name))
            }
            _ => Err(EvalStop("unsupported path method")),
        }
    }

    fn fs_method(&mut self, method: &str, args: Vec<Value<'t>>) -> Eval<'t> {
        match method {
            "readdirSync" => {
                let dir = as_str(args.first().ok_or(EvalStop("missing argument"))?)?;
                let entries = std::fs::read_dir(dir).map_err(|_| EvalStop("readdir failed"))?;
                let mut names: Vec<String> = entries
                    .filter_map(|e| e.ok())
                    .map(|e| e.file_name().to_string_lossy().into_owned())
                    .collect();
                names.sort();
                Ok(Value::List(names.into_iter().map(Value::Str).collect()))
            }
            "existsSync" => {
                let path = as_str(args.first().ok_or(EvalStop("missing argument"))?)?;
                Ok(Value::Bool(Path::new(path).exists()))
            }
            _ => Err(EvalStop("unsupported fs method")),
        }
    }

    fn list_method(
        &mut self,
        items: Vec<Value<'t>>,
        method: &str,
        args: Vec<Value<'t>>,
    ) -> Eval<'t> {
        match method {
            "forEach" => {
                let callback = callback_arg(&args)?;
                for (index, item) in items.into_iter().enumerate() {
                    self.call_function(callback, vec![item, Value::Num(index as f64)])?;
                }
                Ok(Value::Undefined)
            }
            "map" => {
                let callback = callback_arg(&args)?;
                let mut mapped = Vec::new();
                for (index, item) in items.into_iter().enumerate() {
                    mapped.push(self.call_function(callback, vec![item, Value::Num(index as f64)])?);
                }
                Ok(Value::List(mapped))
            }
            "filter" => {
                let callback = callback_arg(&args)?;
                let mut kept = Vec::new();
                for (index, item) in items.into_iter().enumerate() {
                    let keep =
                        self.call_function(callback, vec![item.clone(), Value::Num(index as f64)])?;
                    if truthy(&keep) {
                        kept.push(item);
                    }
                }
                Ok(Value::List(kept))
            }
            "indexOf" => {
                let needle = args.first().ok_or(EvalStop("missing argument"))?;
                let position = items
                    .iter()
                    .position(|item| loosely_equal(item, needle))
                    .map(|p| p as f64)
                    .unwrap_or(-1.0);
                Ok(Value::Num(position))
            }
            "join" => {
                let separator = match args.first() {
                    Some(v) => as_str(v)?.to_string(),
                    None => ",".to_string(),
                };
                let mut parts = Vec::new();
                for item in &items {
                    parts.push(js_display(item)?);
                }
                Ok(Value::Str(parts.join(&separator)))
            }
            _ => Err(EvalStop("unsupported array method")),
        }
    }

    fn call_function(&mut self, definition: Node<'t>, args: Vec<Value<'t>>) -> Eval<'t> {
        if self.call_depth >= MAX_CALL_DEPTH {
            return Err(EvalStop("call depth exceeded"));
        }

        let mut parameters = Vec::new();
        if let Some(single) = definition.child_by_field_name("parameter") {
            parameters.push(single);
        } else if let Some(list) = definition.child_by_field_name("parameters") {
            let mut cursor = list.walk();
            parameters.extend(list.named_children(&mut cursor));
        }

        let mut scope = HashMap::new();
        for (index, parameter) in parameters.iter().enumerate() {
            if parameter.kind() != "identifier" {
                return Err(EvalStop("unsupported parameter pattern"));
            }
            let value = args.get(index).cloned().unwrap_or(Value::Undefined);
            scope.insert(node_text(*parameter, self.source).to_string(), value);
        }

        let body = definition
            .child_by_field_name("body")
            .ok_or(EvalStop("function without body"))?;

        self.call_depth += 1;
        self.scopes.push(scope);
        let result = if body.kind() == "statement_block" {
            self.exec_statement(body).map(|flow| match flow {
                Flow::Return(v) => v,
                Flow::Normal => Value::Undefined,
            })
        } else {
            // concise arrow body
            self.eval(body)
        };
        self.scopes.pop();
        self.call_depth -= 1;
        result
    }

    fn lookup(&self, name: &str) -> Option<Value<'t>> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.get(name).cloned())
    }

    fn declare(&mut self, name: &str, value: Value<'t>) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.to_string(), value);
        }
    }

    fn assign(&mut self, name: &str, value: Value<'t>) {
        for scope in self.scopes.iter_mut().rev() {
            if scope.contains_key(name) {
                scope.insert(name.to_string(), value);
                return;
            }
        }
        // undeclared assignment lands in the outermost scope
        if let Some(scope) = self.scopes.first_mut() {
            scope.insert(name.to_string(), value);
        }
    }
}

fn callback_arg<'a, 't>(args: &'a [Value<'t>]) -> std::result::Result<Node<'t>, EvalStop> {
    match args.first() {
        Some(Value::Func(definition)) => Ok(*definition),
        _ => Err(EvalStop("callback is not a function")),
    }
}

fn string_method<'t>(s: &str, method: &str, args: Vec<Value<'t>>) -> Eval<'t> {
    match method {
        "replace" => {
            let from = as_str(args.first().ok_or(EvalStop("missing argument"))?)?;
            let to = as_str(args.get(1).ok_or(EvalStop("missing argument"))?)?;
            Ok(Value::Str(s.replacen(from, to, 1)))
        }
        "indexOf" => {
            let needle = as_str(args.first().ok_or(EvalStop("missing argument"))?)?;
            let position = s.find(needle).map(|p| p as f64).unwrap_or(-1.0);
            Ok(Value::Num(position))
        }
        "slice" => {
            let len = s.chars().count() as f64;
            let clamp = |n: f64| -> usize {
                let n = if n < 0.0 { len + n } else { n };
                n.clamp(0.0, len) as usize
            };
            let start = match args.first() {
                Some(Value::Num(n)) => clamp(*n),
                _ => 0,
            };
            let end = match args.get(1) {
                Some(Value::Num(n)) => clamp(*n),
                _ => len as usize,
            };
            let sliced: String = s
                .chars()
                .skip(start)
                .take(end.saturating_sub(start))
                .collect();
            Ok(Value::Str(sliced))
        }
        "toLowerCase" => Ok(Value::Str(s.to_lowercase())),
        "toUpperCase" => Ok(Value::Str(s.to_uppercase())),
        _ => Err(EvalStop("unsupported string method")),
    }
}

fn member_value<'t>(object: &Value<'t>, property: &str) -> Eval<'t> {
    match object {
        Value::Str(s) if property == "length" => Ok(Value::Num(s.chars().count() as f64)),
        Value::List(items) if property == "length" => Ok(Value::Num(items.len() as f64)),
        Value::Undefined => Err(EvalStop("member of undefined")),
        // everything else is an inert stub whose members read as undefined
        _ => Ok(Value::Undefined),
    }
}

fn as_str<'a, 't>(value: &'a Value<'t>) -> std::result::Result<&'a str, EvalStop> {
    match value {
        Value::Str(s) => Ok(s),
        _ => Err(EvalStop("expected a string")),
    }
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Undefined => false,
        Value::Bool(b) => *b,
        Value::Num(n) => *n != 0.0 && !n.is_nan(),
        Value::Str(s) => !s.is_empty(),
        _ => true,
    }
}

fn loosely_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Undefined, Value::Undefined) => true,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Num(x), Value::Num(y)) => x == y,
        (Value::Str(x), Value::Str(y)) => x == y,
        _ => false,
    }
}

fn compare<'t>(a: &Value<'t>, b: &Value<'t>, operator: &str) -> Eval<'t> {
    let ordering = match (a, b) {
        (Value::Num(x), Value::Num(y)) => x.partial_cmp(y),
        (Value::Str(x), Value::Str(y)) => Some(x.cmp(y)),
        _ => None,
    };
    let Some(ordering) = ordering else {
        return Err(EvalStop("incomparable values"));
    };
    let result = match operator {
        "<" => ordering.is_lt(),
        "<=" => ordering.is_le(),
        ">" => ordering.is_gt(),
        _ => ordering.is_ge(),
    };
    Ok(Value::Bool(result))
}

fn js_display(value: &Value) -> std::result::Result<String, EvalStop> {
    match value {
        Value::Str(s) => Ok(s.clone()),
        Value::Num(n) => {
            if n.fract() == 0.0 && n.abs() < 1e15 {
                Ok(format!("{}", *n as i64))
            } else {
                Ok(n.to_string())
            }
        }
        Value::Bool(b) => Ok(b.to_string()),
        Value::Undefined => Ok("undefined".to_string()),
        _ => Err(EvalStop("value has no string form")),
    }
}

fn typeof_name(value: &Value) -> &'static str {
    match value {
        Value::Undefined => "undefined",
        Value::Bool(_) => "boolean",
        Value::Num(_) => "number",
        Value::Str(_) => "string",
        Value::Func(_) | Value::Loader => "function",
        _ => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::finder::LoadReference;
    use std::fs;
    use tempfile::TempDir;

    fn dynamic_call(label: &str, ancestry: Vec<&str>) -> FoundCall {
        FoundCall {
            reference: LoadReference::Dynamic(label.to_string()),
            ancestry: ancestry.into_iter().map(String::from).collect(),
        }
    }

    #[test]
    fn test_assignment_preceded_load() {
        let resolver = DynamicResolver::new("require");
        let found = dynamic_call(
            "require(name)",
            vec![
                "require(name);",
                "var name = './a.js';\nrequire(name);",
            ],
        );
        let names = resolver.resolve(Path::new("/tmp/entry.js"), &found).unwrap();
        assert_eq!(names, vec!["./a.js".to_string()]);
    }

    #[test]
    fn test_ternary_of_literals() {
        let resolver = DynamicResolver::new("require");
        let found = dynamic_call(
            "require(debug ? './log.js' : './quiet.js')",
            vec!["var debug = false;\nrequire(debug ? './log.js' : './quiet.js');"],
        );
        let names = resolver.resolve(Path::new("/tmp/entry.js"), &found).unwrap();
        assert_eq!(names, vec!["./quiet.js".to_string()]);
    }

    #[test]
    fn test_string_concatenation() {
        let resolver = DynamicResolver::new("require");
        let found = dynamic_call(
            "require(base + 'util.js')",
            vec!["var base = './lib/';\nrequire(base + 'util.js');"],
        );
        let names = resolver.resolve(Path::new("/tmp/entry.js"), &found).unwrap();
        assert_eq!(names, vec!["./lib/util.js".to_string()]);
    }

    #[test]
    fn test_core_style_names_are_not_captured() {
        let resolver = DynamicResolver::new("require");
        let found = dynamic_call(
            "require(name)",
            vec!["var name = 'fs';\nrequire(name);"],
        );
        assert!(resolver.resolve(Path::new("/tmp/entry.js"), &found).is_none());
    }

    #[test]
    fn test_first_capturing_candidate_wins() {
        let resolver = DynamicResolver::new("require");
        let found = dynamic_call(
            "require(name)",
            vec![
                "var name = './first.js';\nrequire(name);",
                "var name = './second.js';\nrequire(name);",
            ],
        );
        let names = resolver.resolve(Path::new("/tmp/entry.js"), &found).unwrap();
        assert_eq!(names, vec!["./first.js".to_string()]);
    }

    #[test]
    fn test_broken_candidates_are_skipped() {
        let resolver = DynamicResolver::new("require");
        let found = dynamic_call(
            "require(name)",
            vec![
                "require(totallyMissing);",
                "var ( = syntax error",
                "var name = './late.js';\nrequire(name);",
            ],
        );
        let names = resolver.resolve(Path::new("/tmp/entry.js"), &found).unwrap();
        assert_eq!(names, vec!["./late.js".to_string()]);
    }

    #[test]
    fn test_captures_before_an_error_still_count() {
        let resolver = DynamicResolver::new("require");
        let found = dynamic_call(
            "require(x)",
            vec!["require('./early.js');\nrequire(missing);"],
        );
        let names = resolver.resolve(Path::new("/tmp/entry.js"), &found).unwrap();
        assert_eq!(names, vec!["./early.js".to_string()]);
    }

    #[test]
    fn test_readdir_foreach_idiom() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.js"), "").unwrap();
        fs::write(dir.path().join("b.js"), "").unwrap();
        fs::write(dir.path().join("notes.txt"), "").unwrap();
        fs::write(dir.path().join("index.js"), "").unwrap();
        let entry = dir.path().join("index.js").canonicalize().unwrap();

        let fragment = "fs.readdirSync(__dirname).forEach(function (filepath) {\n\
                        \x20 if (filepath !== 'index.js' && path.extname(filepath) === '.js') {\n\
                        \x20   require(path.resolve(__dirname, filepath));\n\
                        \x20 }\n\
                        });";
        let resolver = DynamicResolver::new("require");
        let found = dynamic_call("require(path.resolve(__dirname, filepath))", vec![fragment]);

        let names = resolver.resolve(&entry, &found).unwrap();
        let expected: Vec<String> = ["a.js", "b.js"]
            .iter()
            .map(|n| entry.parent().unwrap().join(n).display().to_string())
            .collect();
        assert_eq!(names, expected);
    }

    #[test]
    fn test_no_candidate_yields_unresolved() {
        let resolver = DynamicResolver::new("require");
        let found = dynamic_call("require(process.argv[2])", vec!["require(process.argv[2]);"]);
        assert!(resolver.resolve(Path::new("/tmp/entry.js"), &found).is_none());
    }
}
