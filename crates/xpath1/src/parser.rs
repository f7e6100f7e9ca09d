//! A recursive-descent compiler from XPath 1.0 tokens to a query operator tree.
//!
//! Parsing and planning happen in one pass: each grammar rule returns the
//! operator that evaluates it. Static checks (function arity, node-set
//! operands, namespace prefixes, variables) are enforced here so evaluation
//! never fails.

use crate::error::XPathError;
use crate::functions::{self, Function, FunctionQuery};
use crate::lexer::{Lexer, Token, TokenKind};
use crate::navigator::Navigator;
use crate::options::{CompileOptions, NamespaceMap};
use crate::query::axes::{Axis, NamespaceBinding, NodeTest};
use crate::query::operators::{
    ArithmeticOp, ArithmeticQuery, CompareOp, CompareQuery, LogicalOp, LogicalQuery,
};
use crate::query::path::{
    ContextQuery, FilterQuery, MergeQuery, RootQuery, StepQuery, UnionQuery, step_shape,
};
use crate::query::{Kind, Query};
use std::marker::PhantomData;

const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

// --- Main Public Parser ---

/// Compiles `source` into an operator tree.
pub fn parse<N: Navigator>(
    source: &str,
    options: &CompileOptions,
    namespaces: &NamespaceMap,
) -> Result<Query<N>, XPathError> {
    let mut parser = Parser::<N>::new(source, options, namespaces)?;
    let query = parser.expression()?;
    if parser.current.kind != TokenKind::Eof {
        let offset = parser.current.offset;
        if options.strict_eof {
            return Err(XPathError::TrailingInput {
                remainder: source[offset..].to_string(),
                offset,
            });
        }
        log::debug!("Ignoring trailing input at offset {}: '{}'", offset, &source[offset..]);
    }
    Ok(query)
}

/// One location step before it is turned into operators.
struct Step<N> {
    axis: Axis,
    test: NodeTest,
    predicates: Vec<Predicate<N>>,
}

struct Predicate<N> {
    query: Query<N>,
    /// The predicate calls `last()` and needs the size of its node group.
    uses_last: bool,
}

struct Parser<'s, 'o, N> {
    lexer: Lexer<'s>,
    current: Token<'s>,
    options: &'o CompileOptions,
    namespaces: &'o NamespaceMap,
    uses_last: bool,
    _node: PhantomData<N>,
}

type ParseResult<T> = Result<T, XPathError>;

impl<'s, 'o, N: Navigator> Parser<'s, 'o, N> {
    fn new(source: &'s str, options: &'o CompileOptions, namespaces: &'o NamespaceMap) -> ParseResult<Self> {
        let mut lexer = Lexer::new(source);
        let current = lexer.next_token()?;
        Ok(Parser {
            lexer,
            current,
            options,
            namespaces,
            uses_last: false,
            _node: PhantomData,
        })
    }

    // --- Combinators & Helpers ---

    fn bump(&mut self) -> ParseResult<Token<'s>> {
        let token = self.current;
        self.current = self.lexer.next_token()?;
        Ok(token)
    }

    fn eat(&mut self, kind: TokenKind) -> ParseResult<bool> {
        if self.current.kind == kind {
            self.bump()?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn expect(&mut self, kind: TokenKind, expected: &str) -> ParseResult<Token<'s>> {
        if self.current.kind == kind {
            self.bump()
        } else {
            Err(self.unexpected(expected))
        }
    }

    fn unexpected(&self, expected: &str) -> XPathError {
        let found = match self.current.kind {
            TokenKind::Eof => "end of input".to_string(),
            TokenKind::Literal => format!("\"{}\"", self.current.text),
            TokenKind::Variable => format!("${}", self.current.text),
            _ => self.current.text.to_string(),
        };
        XPathError::UnexpectedToken {
            expected: expected.to_string(),
            found,
            offset: self.current.offset,
        }
    }

    fn require_node_set(query: &Query<N>, context: &str, offset: usize) -> ParseResult<()> {
        if query.kind() == Kind::NodeSet {
            Ok(())
        } else {
            Err(XPathError::NodeSetRequired {
                context: context.to_string(),
                offset,
            })
        }
    }

    /// Parses a left-associative chain `operand (op operand)*`.
    fn binary_chain<O>(
        &mut self,
        operand: fn(&mut Self) -> ParseResult<Query<N>>,
        operator: fn(TokenKind) -> Option<O>,
        build: fn(O, Query<N>, Query<N>) -> Query<N>,
    ) -> ParseResult<Query<N>> {
        let mut left = operand(self)?;
        while let Some(op) = operator(self.current.kind) {
            self.bump()?;
            let right = operand(self)?;
            left = build(op, left, right);
        }
        Ok(left)
    }

    // --- Expression Parsers (in order of precedence) ---

    fn expression(&mut self) -> ParseResult<Query<N>> {
        self.or_expr()
    }

    fn or_expr(&mut self) -> ParseResult<Query<N>> {
        self.binary_chain(
            Self::and_expr,
            |k| (k == TokenKind::Or).then_some(LogicalOp::Or),
            |op, l, r| Query::Logical(LogicalQuery::new(op, l, r)),
        )
    }

    fn and_expr(&mut self) -> ParseResult<Query<N>> {
        self.binary_chain(
            Self::equality_expr,
            |k| (k == TokenKind::And).then_some(LogicalOp::And),
            |op, l, r| Query::Logical(LogicalQuery::new(op, l, r)),
        )
    }

    fn equality_expr(&mut self) -> ParseResult<Query<N>> {
        self.binary_chain(
            Self::relational_expr,
            |k| match k {
                TokenKind::Equal => Some(CompareOp::Eq),
                TokenKind::NotEqual => Some(CompareOp::Ne),
                _ => None,
            },
            |op, l, r| Query::Compare(CompareQuery::new(op, l, r)),
        )
    }

    fn relational_expr(&mut self) -> ParseResult<Query<N>> {
        self.binary_chain(
            Self::additive_expr,
            |k| match k {
                TokenKind::Less => Some(CompareOp::Lt),
                TokenKind::LessEqual => Some(CompareOp::Le),
                TokenKind::Greater => Some(CompareOp::Gt),
                TokenKind::GreaterEqual => Some(CompareOp::Ge),
                _ => None,
            },
            |op, l, r| Query::Compare(CompareQuery::new(op, l, r)),
        )
    }

    fn additive_expr(&mut self) -> ParseResult<Query<N>> {
        self.binary_chain(
            Self::multiplicative_expr,
            |k| match k {
                TokenKind::Plus => Some(ArithmeticOp::Add),
                TokenKind::Minus => Some(ArithmeticOp::Subtract),
                _ => None,
            },
            |op, l, r| Query::Arithmetic(ArithmeticQuery::new(op, l, r)),
        )
    }

    fn multiplicative_expr(&mut self) -> ParseResult<Query<N>> {
        self.binary_chain(
            Self::unary_expr,
            |k| match k {
                TokenKind::Multiply => Some(ArithmeticOp::Multiply),
                TokenKind::Div => Some(ArithmeticOp::Divide),
                TokenKind::Mod => Some(ArithmeticOp::Modulo),
                _ => None,
            },
            |op, l, r| Query::Arithmetic(ArithmeticQuery::new(op, l, r)),
        )
    }

    fn unary_expr(&mut self) -> ParseResult<Query<N>> {
        if self.eat(TokenKind::Minus)? {
            let operand = self.unary_expr()?;
            return Ok(Query::Negate(Box::new(operand)));
        }
        self.union_expr()
    }

    fn union_expr(&mut self) -> ParseResult<Query<N>> {
        let start = self.current.offset;
        let mut left = self.path_expr()?;
        while self.current.kind == TokenKind::Pipe {
            Self::require_node_set(&left, "Union operand", start)?;
            self.bump()?;
            let offset = self.current.offset;
            let right = self.path_expr()?;
            Self::require_node_set(&right, "Union operand", offset)?;
            left = Query::Union(UnionQuery::new(left, right));
        }
        Ok(left)
    }

    // --- Path Parsers ---

    fn at_step_start(&self) -> bool {
        matches!(
            self.current.kind,
            TokenKind::Dot
                | TokenKind::DotDot
                | TokenKind::At
                | TokenKind::AxisName
                | TokenKind::Name
                | TokenKind::NodeType
        )
    }

    /// Handles the ambiguity between location paths and primary expressions
    /// that may be followed by a path.
    fn path_expr(&mut self) -> ParseResult<Query<N>> {
        match self.current.kind {
            TokenKind::Slash => {
                self.bump()?;
                let root = Query::Root(RootQuery::default());
                if self.at_step_start() {
                    self.relative_path(root, false)
                } else {
                    Ok(root)
                }
            }
            TokenKind::DoubleSlash => {
                self.bump()?;
                self.relative_path(Query::Root(RootQuery::default()), true)
            }
            _ if self.at_step_start() => {
                self.relative_path(Query::Context(ContextQuery::default()), false)
            }
            _ => {
                let start = self.current.offset;
                let filtered = self.filter_expr()?;
                let descendant = match self.current.kind {
                    TokenKind::Slash => false,
                    TokenKind::DoubleSlash => true,
                    _ => return Ok(filtered),
                };
                Self::require_node_set(&filtered, "Path start", start)?;
                self.bump()?;
                self.relative_path(filtered, descendant)
            }
        }
    }

    /// Parses `step (('/' | '//') step)*` on top of `input`. `descendant` tells
    /// whether the first step follows a `//`.
    fn relative_path(&mut self, mut input: Query<N>, mut descendant: bool) -> ParseResult<Query<N>> {
        loop {
            let step = self.step()?;
            input = Self::plan_step(input, step, descendant);
            descendant = match self.current.kind {
                TokenKind::Slash => false,
                TokenKind::DoubleSlash => true,
                _ => return Ok(input),
            };
            self.bump()?;
        }
    }

    /// Turns a step into operators, inserting a merge when its output could
    /// leave document order.
    fn plan_step(mut input: Query<N>, mut step: Step<N>, descendant: bool) -> Query<N> {
        if descendant {
            if step.axis == Axis::Child && step.predicates.is_empty() {
                // `//name` is `descendant::name` when no position is involved.
                step.axis = Axis::Descendant;
            } else {
                let any = Step {
                    axis: Axis::DescendantOrSelf,
                    test: NodeTest::Node,
                    predicates: Vec::new(),
                };
                input = Self::plan_step(input, any, false);
            }
        }

        let needs_merge = step_shape(input.shape(), step.axis).is_none();
        let mut query = Query::Step(StepQuery::new(input, step.axis, step.test));
        for predicate in step.predicates {
            query = Query::Filter(FilterQuery::new(query, predicate.query, true, predicate.uses_last));
        }
        if needs_merge {
            query = Query::Merge(MergeQuery::new(query));
        }
        query
    }

    fn step(&mut self) -> ParseResult<Step<N>> {
        let (axis, test) = match self.current.kind {
            TokenKind::Dot => {
                self.bump()?;
                (Axis::SelfAxis, NodeTest::Node)
            }
            TokenKind::DotDot => {
                self.bump()?;
                (Axis::Parent, NodeTest::Node)
            }
            TokenKind::At => {
                self.bump()?;
                (Axis::Attribute, self.node_test()?)
            }
            TokenKind::AxisName => {
                let token = self.bump()?;
                let axis = Axis::from_name(token.text).ok_or_else(|| XPathError::UnexpectedToken {
                    expected: "axis name".to_string(),
                    found: token.text.to_string(),
                    offset: token.offset,
                })?;
                self.expect(TokenKind::ColonColon, "'::'")?;
                (axis, self.node_test()?)
            }
            TokenKind::Name | TokenKind::NodeType => (Axis::Child, self.node_test()?),
            _ => return Err(self.unexpected("location step")),
        };
        let predicates = self.predicates()?;
        Ok(Step {
            axis,
            test,
            predicates,
        })
    }

    fn node_test(&mut self) -> ParseResult<NodeTest> {
        match self.current.kind {
            TokenKind::Name => {
                let token = self.bump()?;
                self.name_test(token)
            }
            TokenKind::NodeType => {
                let token = self.bump()?;
                self.expect(TokenKind::LeftParen, "'('")?;
                self.expect(TokenKind::RightParen, "')'")?;
                Ok(match token.text {
                    "text" => NodeTest::Text,
                    "comment" => NodeTest::Comment,
                    _ => NodeTest::Node,
                })
            }
            _ => Err(self.unexpected("node test")),
        }
    }

    fn name_test(&self, token: Token<'s>) -> ParseResult<NodeTest> {
        if token.text == "*" {
            return Ok(NodeTest::Any);
        }
        match token.text.split_once(':') {
            Some((prefix, "*")) => Ok(NodeTest::Namespace(self.resolve(prefix, token.offset)?)),
            Some((prefix, local)) => Ok(NodeTest::Name {
                namespace: Some(self.resolve(prefix, token.offset)?),
                local: local.to_string(),
            }),
            None => Ok(NodeTest::Name {
                namespace: None,
                local: token.text.to_string(),
            }),
        }
    }

    fn resolve(&self, prefix: &str, offset: usize) -> ParseResult<NamespaceBinding> {
        let uri = match self.namespaces.get(prefix) {
            Some(uri) => uri.clone(),
            None if prefix == "xml" => XML_NAMESPACE.to_string(),
            None => {
                return Err(XPathError::UndeclaredPrefix {
                    prefix: prefix.to_string(),
                    offset,
                });
            }
        };
        Ok(NamespaceBinding {
            prefix: prefix.to_string(),
            uri,
        })
    }

    fn predicates(&mut self) -> ParseResult<Vec<Predicate<N>>> {
        let mut predicates = Vec::new();
        while self.eat(TokenKind::LeftBracket)? {
            let outer = std::mem::replace(&mut self.uses_last, false);
            let query = self.expression()?;
            let uses_last = std::mem::replace(&mut self.uses_last, outer);
            self.expect(TokenKind::RightBracket, "']'")?;
            predicates.push(Predicate { query, uses_last });
        }
        Ok(predicates)
    }

    /// A primary expression with optional predicates. Predicates here see the
    /// whole node-set as a single group.
    fn filter_expr(&mut self) -> ParseResult<Query<N>> {
        let start = self.current.offset;
        let mut query = self.primary_expr()?;
        if self.current.kind == TokenKind::LeftBracket {
            Self::require_node_set(&query, "Predicate target", start)?;
            for predicate in self.predicates()? {
                query = Query::Filter(FilterQuery::new(query, predicate.query, false, predicate.uses_last));
            }
        }
        Ok(query)
    }

    fn primary_expr(&mut self) -> ParseResult<Query<N>> {
        match self.current.kind {
            TokenKind::LeftParen => {
                self.bump()?;
                let inner = self.expression()?;
                self.expect(TokenKind::RightParen, "')'")?;
                Ok(inner)
            }
            TokenKind::Literal => {
                let token = self.bump()?;
                Ok(Query::Literal(token.text.to_string()))
            }
            TokenKind::Number => {
                let token = self.bump()?;
                Ok(Query::Number(token.text.parse().unwrap_or(f64::NAN)))
            }
            TokenKind::Variable => {
                let token = self.bump()?;
                let value = self.options.variables.get(token.text).cloned().ok_or_else(|| {
                    XPathError::UndeclaredVariable {
                        name: token.text.to_string(),
                        offset: token.offset,
                    }
                })?;
                Ok(Query::Variable(value))
            }
            TokenKind::FunctionName => self.function_call(),
            _ => Err(self.unexpected("expression")),
        }
    }

    // --- Function Call Parser ---

    fn function_call(&mut self) -> ParseResult<Query<N>> {
        let token = self.bump()?;
        let signature = functions::lookup(token.text).ok_or_else(|| XPathError::UnknownFunction {
            name: token.text.to_string(),
            offset: token.offset,
        })?;
        self.expect(TokenKind::LeftParen, "'('")?;

        let mut args = Vec::new();
        if self.current.kind != TokenKind::RightParen {
            loop {
                let offset = self.current.offset;
                let arg = self.expression()?;
                if signature.node_set_args {
                    Self::require_node_set(&arg, &format!("Argument of {}()", signature.name), offset)?;
                }
                args.push(arg);
                if !self.eat(TokenKind::Comma)? {
                    break;
                }
            }
        }
        self.expect(TokenKind::RightParen, "')'")?;

        if !signature.accepts(args.len()) {
            return Err(XPathError::Arity {
                name: signature.name.to_string(),
                expected: signature.arity(),
                found: args.len(),
                offset: token.offset,
            });
        }
        if signature.function == Function::Last {
            self.uses_last = true;
        }
        Ok(Query::Function(FunctionQuery::new(signature, args)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::navigator::tests::MockNavigator;

    type Q = Query<MockNavigator<'static>>;

    fn compile(source: &str) -> ParseResult<Q> {
        parse(source, &CompileOptions::default(), &NamespaceMap::new())
    }

    #[test]
    fn test_parse_kinds() {
        assert_eq!(compile("para").unwrap().kind(), Kind::NodeSet);
        assert_eq!(compile("1 + 2 * 3").unwrap().kind(), Kind::Number);
        assert_eq!(compile("a = 'x' or b").unwrap().kind(), Kind::Boolean);
        assert_eq!(compile("concat('a', 'b')").unwrap().kind(), Kind::String);
        assert_eq!(compile("-count(//x)").unwrap().kind(), Kind::Number);
        assert_eq!(compile("/").unwrap().kind(), Kind::NodeSet);
    }

    #[test]
    fn test_descendant_rewrite() {
        // `//para` becomes a single descendant step; no merge needed.
        assert!(matches!(compile("//para").unwrap(), Query::Step(_)));
        // `//para[1]` keeps per-parent positions and must be merged.
        assert!(matches!(compile("//para[1]").unwrap(), Query::Merge(_)));
        assert!(matches!(compile("a/b").unwrap(), Query::Step(_)));
        assert!(matches!(compile("a//b/c").unwrap(), Query::Merge(_)));
        assert!(matches!(compile("a | b").unwrap(), Query::Union(_)));
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(compile("foo("), Err(XPathError::UnknownFunction { .. })));
        assert!(matches!(compile("count()"), Err(XPathError::Arity { found: 0, .. })));
        assert!(matches!(compile("true(1)"), Err(XPathError::Arity { .. })));
        assert!(matches!(compile("count(1)"), Err(XPathError::NodeSetRequired { offset: 6, .. })));
        assert!(matches!(compile("1 | a"), Err(XPathError::NodeSetRequired { .. })));
        assert!(matches!(compile("'a'/b"), Err(XPathError::NodeSetRequired { .. })));
        assert!(matches!(compile("'a'[1]"), Err(XPathError::NodeSetRequired { .. })));
        assert!(matches!(compile("ns:a"), Err(XPathError::UndeclaredPrefix { .. })));
        assert!(matches!(compile("$v"), Err(XPathError::UndeclaredVariable { .. })));
        assert!(matches!(compile("bogus::a"), Err(XPathError::UnexpectedToken { .. })));
        assert!(matches!(compile("a["), Err(XPathError::UnexpectedToken { .. })));
        assert!(matches!(compile("(1"), Err(XPathError::UnexpectedToken { .. })));
        assert!(matches!(compile("a/"), Err(XPathError::UnexpectedToken { .. })));
    }

    #[test]
    fn test_trailing_input() {
        assert!(compile("a b").is_ok());
        let strict = parse::<MockNavigator<'static>>("a b", &CompileOptions::strict(), &NamespaceMap::new());
        assert_eq!(
            strict.unwrap_err(),
            XPathError::TrailingInput {
                remainder: "b".to_string(),
                offset: 2
            }
        );
    }

    #[test]
    fn test_namespaces_and_variables() {
        let mut namespaces = NamespaceMap::new();
        namespaces.insert("ns".to_string(), "urn:test".to_string());
        let options = CompileOptions::default().with_variable("limit", 3.0);
        let query: Q = parse("ns:item[position() < $limit] | ns:*", &options, &namespaces).unwrap();
        assert!(matches!(query, Query::Union(_)));
        assert!(compile("@xml:lang").is_ok());
    }
}
