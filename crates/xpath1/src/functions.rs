//! Defines the built-in XPath 1.0 function library.
//!
//! Arity and argument kinds are checked when the call is compiled, so the
//! implementations here never fail: they only coerce.

use crate::navigator::{Navigator, NodeType};
use crate::query::{Context, Kind, Query};
use crate::value::{Value, string_to_number};
use itertools::Itertools;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Function {
    // Core & node-set
    Count,
    Position,
    Last,
    LocalName,
    Name,
    NamespaceUri,
    // String
    String,
    Concat,
    StartsWith,
    Contains,
    SubstringBefore,
    SubstringAfter,
    Substring,
    StringLength,
    NormalizeSpace,
    Translate,
    // Boolean
    Boolean,
    Not,
    True,
    False,
    Lang,
    // Number
    Number,
    Sum,
    Floor,
    Ceiling,
    Round,
}

/// Compile-time description of a built-in.
#[derive(Debug)]
pub struct Signature {
    pub name: &'static str,
    pub function: Function,
    pub min_args: usize,
    /// `None` for variadic functions.
    pub max_args: Option<usize>,
    pub result: Kind,
    /// Every argument must be a node-set expression.
    pub node_set_args: bool,
}

impl Signature {
    pub fn accepts(&self, count: usize) -> bool {
        count >= self.min_args && self.max_args.is_none_or(|max| count <= max)
    }

    /// Human-readable arity for error messages: `1`, `0 or 1`, `2 to 3`, `at least 2`.
    pub fn arity(&self) -> String {
        match self.max_args {
            None => format!("at least {}", self.min_args),
            Some(max) if max == self.min_args => max.to_string(),
            Some(max) if max == self.min_args + 1 => format!("{} or {}", self.min_args, max),
            Some(max) => format!("{} to {}", self.min_args, max),
        }
    }
}

const fn builtin(
    name: &'static str,
    function: Function,
    min_args: usize,
    max_args: Option<usize>,
    result: Kind,
) -> Signature {
    Signature {
        name,
        function,
        min_args,
        max_args,
        result,
        node_set_args: false,
    }
}

const fn node_set_builtin(
    name: &'static str,
    function: Function,
    min_args: usize,
    result: Kind,
) -> Signature {
    Signature {
        name,
        function,
        min_args,
        max_args: Some(1),
        result,
        node_set_args: true,
    }
}

static BUILTINS: &[Signature] = &[
    node_set_builtin("count", Function::Count, 1, Kind::Number),
    builtin("position", Function::Position, 0, Some(0), Kind::Number),
    builtin("last", Function::Last, 0, Some(0), Kind::Number),
    node_set_builtin("local-name", Function::LocalName, 0, Kind::String),
    node_set_builtin("name", Function::Name, 0, Kind::String),
    node_set_builtin("namespace-uri", Function::NamespaceUri, 0, Kind::String),
    builtin("string", Function::String, 0, Some(1), Kind::String),
    builtin("concat", Function::Concat, 2, None, Kind::String),
    builtin("starts-with", Function::StartsWith, 2, Some(2), Kind::Boolean),
    builtin("contains", Function::Contains, 2, Some(2), Kind::Boolean),
    builtin("substring-before", Function::SubstringBefore, 2, Some(2), Kind::String),
    builtin("substring-after", Function::SubstringAfter, 2, Some(2), Kind::String),
    builtin("substring", Function::Substring, 2, Some(3), Kind::String),
    builtin("string-length", Function::StringLength, 0, Some(1), Kind::Number),
    builtin("normalize-space", Function::NormalizeSpace, 0, Some(1), Kind::String),
    builtin("translate", Function::Translate, 3, Some(3), Kind::String),
    builtin("boolean", Function::Boolean, 1, Some(1), Kind::Boolean),
    builtin("not", Function::Not, 1, Some(1), Kind::Boolean),
    builtin("true", Function::True, 0, Some(0), Kind::Boolean),
    builtin("false", Function::False, 0, Some(0), Kind::Boolean),
    builtin("lang", Function::Lang, 1, Some(1), Kind::Boolean),
    builtin("number", Function::Number, 0, Some(1), Kind::Number),
    node_set_builtin("sum", Function::Sum, 1, Kind::Number),
    builtin("floor", Function::Floor, 1, Some(1), Kind::Number),
    builtin("ceiling", Function::Ceiling, 1, Some(1), Kind::Number),
    builtin("round", Function::Round, 1, Some(1), Kind::Number),
];

pub fn lookup(name: &str) -> Option<&'static Signature> {
    BUILTINS.iter().find(|s| s.name == name)
}

/// A call to a built-in function.
#[derive(Debug, Clone)]
pub struct FunctionQuery<N> {
    function: Function,
    result: Kind,
    args: Vec<Query<N>>,
}

impl<N: Navigator> FunctionQuery<N> {
    pub fn new(signature: &Signature, args: Vec<Query<N>>) -> Self {
        FunctionQuery {
            function: signature.function,
            result: signature.result,
            args,
        }
    }

    pub fn kind(&self) -> Kind {
        self.result
    }

    pub fn reset(&mut self) {
        self.args.iter_mut().for_each(Query::reset);
    }

    /// Dispatches the call to the correct implementation.
    pub fn evaluate(&self, ctx: &Context<'_, N>) -> Value<N> {
        let args: Vec<Value<N>> = self.args.iter().map(|a| a.evaluate(ctx)).collect();
        match self.function {
            Function::Count => func_count(args),
            Function::Position => Value::Number(ctx.position as f64),
            Function::Last => Value::Number(ctx.size as f64),
            Function::LocalName => func_local_name(args, ctx),
            Function::Name => func_name(args, ctx),
            Function::NamespaceUri => func_namespace_uri(args, ctx),
            Function::String => Value::String(string_arg(args, ctx)),
            Function::Concat => Value::String(args.iter().map(|v| v.to_string()).collect()),
            Function::StartsWith => func_starts_with(args),
            Function::Contains => func_contains(args),
            Function::SubstringBefore => func_substring_before(args),
            Function::SubstringAfter => func_substring_after(args),
            Function::Substring => func_substring(args),
            Function::StringLength => {
                Value::Number(string_arg(args, ctx).chars().count() as f64)
            }
            Function::NormalizeSpace => func_normalize_space(args, ctx),
            Function::Translate => func_translate(args),
            Function::Boolean => Value::Boolean(args.first().is_some_and(Value::to_bool)),
            Function::Not => Value::Boolean(!args.first().is_some_and(Value::to_bool)),
            Function::True => Value::Boolean(true),
            Function::False => Value::Boolean(false),
            Function::Lang => func_lang(args, ctx),
            Function::Number => func_number(args, ctx),
            Function::Sum => func_sum(args),
            Function::Floor => Value::Number(first_number(args).floor()),
            Function::Ceiling => Value::Number(first_number(args).ceil()),
            Function::Round => Value::Number(round(first_number(args))),
        }
    }
}

// --- Argument helpers ---

/// The single optional argument as a string, defaulting to the context node.
fn string_arg<N: Navigator>(mut args: Vec<Value<N>>, ctx: &Context<'_, N>) -> String {
    match args.pop() {
        Some(v) => v.to_string(),
        None => ctx.node.value(),
    }
}

/// The single optional node-set argument's first node, defaulting to the context node.
fn node_arg<N: Navigator>(mut args: Vec<Value<N>>, ctx: &Context<'_, N>) -> Option<N> {
    match args.pop() {
        Some(Value::NodeSet(nodes)) => nodes.first(),
        Some(_) => None,
        None => Some(ctx.node.clone()),
    }
}

fn first_number<N: Navigator>(args: Vec<Value<N>>) -> f64 {
    args.first().map(Value::to_number).unwrap_or(f64::NAN)
}

fn two_strings<N: Navigator>(mut args: Vec<Value<N>>) -> (String, String) {
    let s2 = args.pop().map(|v| v.to_string()).unwrap_or_default();
    let s1 = args.pop().map(|v| v.to_string()).unwrap_or_default();
    (s1, s2)
}

// --- Core & Node-Set Functions ---

fn func_count<N: Navigator>(mut args: Vec<Value<N>>) -> Value<N> {
    let count = match args.pop() {
        Some(Value::NodeSet(nodes)) => nodes.count(),
        _ => 0,
    };
    Value::Number(count as f64)
}

fn func_local_name<N: Navigator>(args: Vec<Value<N>>, ctx: &Context<'_, N>) -> Value<N> {
    let name = node_arg(args, ctx)
        .map(|n| n.local_name().to_string())
        .unwrap_or_default();
    Value::String(name)
}

fn func_name<N: Navigator>(args: Vec<Value<N>>, ctx: &Context<'_, N>) -> Value<N> {
    let name = node_arg(args, ctx)
        .map(|n| {
            if n.prefix().is_empty() {
                n.local_name().to_string()
            } else {
                format!("{}:{}", n.prefix(), n.local_name())
            }
        })
        .unwrap_or_default();
    Value::String(name)
}

fn func_namespace_uri<N: Navigator>(args: Vec<Value<N>>, ctx: &Context<'_, N>) -> Value<N> {
    let uri = node_arg(args, ctx)
        .and_then(|n| n.namespace_uri().map(str::to_string))
        .unwrap_or_default();
    Value::String(uri)
}

// --- String Functions ---

fn func_starts_with<N: Navigator>(args: Vec<Value<N>>) -> Value<N> {
    let (s1, s2) = two_strings(args);
    Value::Boolean(s1.starts_with(&s2))
}

fn func_contains<N: Navigator>(args: Vec<Value<N>>) -> Value<N> {
    let (s1, s2) = two_strings(args);
    Value::Boolean(s1.contains(&s2))
}

fn func_substring_before<N: Navigator>(args: Vec<Value<N>>) -> Value<N> {
    let (s1, s2) = two_strings(args);
    let before = s1.find(&s2).map(|index| &s1[..index]).unwrap_or_default();
    Value::String(before.to_string())
}

fn func_substring_after<N: Navigator>(args: Vec<Value<N>>) -> Value<N> {
    let (s1, s2) = two_strings(args);
    let after = s1
        .find(&s2)
        .map(|index| &s1[index + s2.len()..])
        .unwrap_or_default();
    Value::String(after.to_string())
}

fn func_substring<N: Navigator>(mut args: Vec<Value<N>>) -> Value<N> {
    let length = if args.len() == 3 {
        args.pop().map(|v| v.to_number())
    } else {
        None
    };
    let start = args.pop().map(|v| v.to_number()).unwrap_or(f64::NAN);
    let s = args.pop().map(|v| v.to_string()).unwrap_or_default();

    // Positions are 1-based and both bounds use XPath rounding.
    let first = round(start);
    let last = length.map_or(f64::INFINITY, |l| first + round(l));
    let result = s
        .chars()
        .enumerate()
        .filter(|(i, _)| {
            let pos = (i + 1) as f64;
            pos >= first && pos < last
        })
        .map(|(_, c)| c)
        .collect();
    Value::String(result)
}

fn func_normalize_space<N: Navigator>(args: Vec<Value<N>>, ctx: &Context<'_, N>) -> Value<N> {
    let s = string_arg(args, ctx);
    let normalized = s
        .split(crate::lexer::is_xpath_whitespace)
        .filter(|part| !part.is_empty())
        .join(" ");
    Value::String(normalized)
}

fn func_translate<N: Navigator>(mut args: Vec<Value<N>>) -> Value<N> {
    let to: Vec<char> = args.pop().map(|v| v.to_string()).unwrap_or_default().chars().collect();
    let from: Vec<char> = args.pop().map(|v| v.to_string()).unwrap_or_default().chars().collect();
    let source = args.pop().map(|v| v.to_string()).unwrap_or_default();
    let result = source
        .chars()
        .filter_map(|c| match from.iter().position(|&fc| fc == c) {
            Some(pos) => to.get(pos).copied(),
            None => Some(c),
        })
        .collect();
    Value::String(result)
}

// --- Boolean Functions ---

fn func_lang<N: Navigator>(args: Vec<Value<N>>, ctx: &Context<'_, N>) -> Value<N> {
    let test_lang = args.first().map(|v| v.to_string()).unwrap_or_default().to_lowercase();
    let mut node = ctx.node.clone();
    if node.node_type() != NodeType::Element && !node.move_to_parent() {
        return Value::Boolean(false);
    }
    loop {
        let mut attr = node.clone();
        while attr.move_to_next_attribute() {
            if attr.prefix() == "xml" && attr.local_name() == "lang" {
                // The nearest xml:lang decides, matching subcodes ("en" matches "en-GB").
                let node_lang = attr.value().to_lowercase();
                let matches = node_lang == test_lang
                    || node_lang.starts_with(&format!("{}-", test_lang));
                return Value::Boolean(matches);
            }
        }
        if !node.move_to_parent() {
            return Value::Boolean(false);
        }
    }
}

// --- Number Functions ---

fn func_number<N: Navigator>(mut args: Vec<Value<N>>, ctx: &Context<'_, N>) -> Value<N> {
    let n = match args.pop() {
        Some(v) => v.to_number(),
        None => string_to_number(&ctx.node.value()),
    };
    Value::Number(n)
}

fn func_sum<N: Navigator>(mut args: Vec<Value<N>>) -> Value<N> {
    let sum = match args.pop() {
        Some(Value::NodeSet(nodes)) => nodes.map(|node| string_to_number(&node.value())).sum(),
        _ => 0.0,
    };
    Value::Number(sum)
}

/// XPath 1.0 `round()`: halves go towards positive infinity.
fn round(n: f64) -> f64 {
    if n.is_nan() || n.is_infinite() || n == 0.0 {
        return n;
    }
    if (-0.5..0.0).contains(&n) {
        return -0.0;
    }
    let floor = n.floor();
    if n - floor >= 0.5 { floor + 1.0 } else { floor }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::navigator::tests::{MockNavigator, create_test_tree};

    type V<'a> = Value<MockNavigator<'a>>;

    fn call<'a>(name: &str, args: Vec<Query<MockNavigator<'a>>>, ctx: &Context<'_, MockNavigator<'a>>) -> V<'a> {
        let signature = lookup(name).unwrap();
        assert!(signature.accepts(args.len()), "bad arity for {name}");
        FunctionQuery::new(signature, args).evaluate(ctx)
    }

    fn s<'a>(text: &str) -> Query<MockNavigator<'a>> {
        Query::Literal(text.to_string())
    }

    fn n<'a>(value: f64) -> Query<MockNavigator<'a>> {
        Query::Number(value)
    }

    #[test]
    fn test_signatures() {
        assert!(lookup("concat").unwrap().accepts(5));
        assert!(!lookup("concat").unwrap().accepts(1));
        assert!(!lookup("true").unwrap().accepts(1));
        assert_eq!(lookup("substring").unwrap().arity(), "2 or 3");
        assert_eq!(lookup("translate").unwrap().arity(), "3");
        assert_eq!(lookup("concat").unwrap().arity(), "at least 2");
        assert!(lookup("node").is_none());
        assert!(lookup("count").unwrap().node_set_args);
    }

    #[test]
    fn test_string_functions() {
        let tree = create_test_tree();
        let root = tree.navigator();
        let ctx = Context::new(&root);

        assert_eq!(call("concat", vec![s("Hello"), s(" "), s("World"), n(42.0)], &ctx).to_string(), "Hello World42");
        assert!(call("starts-with", vec![s("abcdef"), s("abc")], &ctx).to_bool());
        assert!(!call("contains", vec![s("abcdef"), s("xyz")], &ctx).to_bool());
        assert_eq!(call("substring-before", vec![s("1999/04/01"), s("/")], &ctx).to_string(), "1999");
        assert_eq!(call("substring-after", vec![s("1999/04/01"), s("/")], &ctx).to_string(), "04/01");
        assert_eq!(call("substring-after", vec![s("abc"), s("x")], &ctx).to_string(), "");
        assert_eq!(call("translate", vec![s("bar"), s("abc"), s("ABC")], &ctx).to_string(), "BAr");
        assert_eq!(call("translate", vec![s("--aaa--"), s("abc-"), s("ABC")], &ctx).to_string(), "AAA");
        assert_eq!(call("normalize-space", vec![s("  a \n b\t ")], &ctx).to_string(), "a b");
        assert_eq!(call("string-length", vec![s("héllo")], &ctx).to_number(), 5.0);
        assert_eq!(call("string-length", vec![], &ctx).to_number(), 10.0);
        assert_eq!(call("string", vec![n(0.5)], &ctx).to_string(), "0.5");
    }

    #[test]
    fn test_substring_rounding() {
        let tree = create_test_tree();
        let root = tree.navigator();
        let ctx = Context::new(&root);
        let sub = |args| call("substring", args, &ctx).to_string();

        assert_eq!(sub(vec![s("12345"), n(2.0), n(3.0)]), "234");
        assert_eq!(sub(vec![s("12345"), n(2.0)]), "2345");
        assert_eq!(sub(vec![s("12345"), n(1.5), n(2.6)]), "234");
        assert_eq!(sub(vec![s("12345"), n(0.0), n(3.0)]), "12");
        assert_eq!(sub(vec![s("12345"), n(f64::NAN), n(3.0)]), "");
        assert_eq!(sub(vec![s("12345"), n(-42.0), n(f64::INFINITY)]), "12345");
    }

    #[test]
    fn test_number_functions() {
        let tree = create_test_tree();
        let root = tree.navigator();
        let ctx = Context::new(&root);

        assert_eq!(call("round", vec![n(2.5)], &ctx).to_number(), 3.0);
        assert_eq!(call("round", vec![n(-2.5)], &ctx).to_number(), -2.0);
        assert_eq!(call("round", vec![n(0.49999999999999994)], &ctx).to_number(), 0.0);
        assert_eq!(call("round", vec![n(4503599627370497.0)], &ctx).to_number(), 4503599627370497.0);
        assert_eq!(call("round", vec![n(-1.5)], &ctx).to_number(), -1.0);
        assert!(call("round", vec![n(-0.2)], &ctx).to_number().is_sign_negative());
        assert!(call("round", vec![n(f64::NAN)], &ctx).to_number().is_nan());
        assert_eq!(call("floor", vec![n(-1.5)], &ctx).to_number(), -2.0);
        assert_eq!(call("ceiling", vec![n(1.1)], &ctx).to_number(), 2.0);
        assert_eq!(call("number", vec![s(" 7 ")], &ctx).to_number(), 7.0);
        assert!(call("number", vec![], &ctx).to_number().is_nan());
    }

    #[test]
    fn test_boolean_functions() {
        let tree = create_test_tree();
        let text = tree.navigator_at(4);
        let ctx = Context::new(&text);

        assert!(call("lang", vec![s("EN")], &ctx).to_bool());
        assert!(!call("lang", vec![s("fr")], &ctx).to_bool());
        assert!(call("not", vec![s("")], &ctx).to_bool());
        assert!(call("boolean", vec![n(2.0)], &ctx).to_bool());
        assert!(call("true", vec![], &ctx).to_bool());

        let other = tree.navigator_at(8);
        assert!(!call("lang", vec![s("en")], &Context::new(&other)).to_bool());
    }

    #[test]
    fn test_context_functions() {
        let tree = create_test_tree();
        let lang = tree.navigator_at(3);
        let ctx = Context {
            node: &lang,
            position: 2,
            size: 4,
        };
        assert_eq!(call("position", vec![], &ctx).to_number(), 2.0);
        assert_eq!(call("last", vec![], &ctx).to_number(), 4.0);
        assert_eq!(call("name", vec![], &ctx).to_string(), "xml:lang");
        assert_eq!(call("local-name", vec![], &ctx).to_string(), "lang");
        assert_eq!(
            call("namespace-uri", vec![], &ctx).to_string(),
            "http://www.w3.org/XML/1998/namespace"
        );
    }
}
