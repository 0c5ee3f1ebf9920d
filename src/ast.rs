/// AST node types consumed by the interpreter.
/// A parser (not part of this crate) produces these; [`build`] offers small
/// constructors for assembling trees by hand.

#[derive(Clone, Debug, Default)]
pub struct Program {
    pub body: Vec<Statement>,
}

#[derive(Clone, Debug)]
pub enum Statement {
    Empty,
    Expression(Expression),
    Block(Vec<Statement>),
    Variable(VariableDeclaration),
    If(IfStatement),
    While(WhileStatement),
    DoWhile(DoWhileStatement),
    For(ForStatement),
    ForIn(ForInStatement),
    ForOf(ForOfStatement),
    Return(Option<Expression>),
    Break(Option<String>),
    Continue(Option<String>),
    Throw(Expression),
    Try(TryStatement),
    Switch(SwitchStatement),
    Labeled(String, Box<Statement>),
    FunctionDeclaration(FunctionDecl),
    ClassDeclaration(ClassDecl),
}

#[derive(Clone, Debug)]
pub struct VariableDeclaration {
    pub kind: VarKind,
    pub declarations: Vec<VariableDeclarator>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VarKind {
    Var,
    Let,
    Const,
}

#[derive(Clone, Debug)]
pub struct VariableDeclarator {
    pub pattern: Pattern,
    pub init: Option<Expression>,
}

#[derive(Clone, Debug)]
pub enum Pattern {
    Identifier(String),
    Array(Vec<Option<ArrayPatternElement>>),
    Object(Vec<ObjectPatternProperty>),
    Assign(Box<Pattern>, Box<Expression>),
    Rest(Box<Pattern>),
    /// Only valid as a destructuring-assignment target.
    MemberExpression(Box<Expression>),
}

#[derive(Clone, Debug)]
pub enum ArrayPatternElement {
    Pattern(Pattern),
    Rest(Pattern),
}

#[derive(Clone, Debug)]
pub enum ObjectPatternProperty {
    KeyValue(PropertyName, Pattern),
    Shorthand(String),
    Rest(Pattern),
}

#[derive(Clone, Debug)]
pub enum Expression {
    Literal(Literal),
    Identifier(String),
    This,
    Array(Vec<Option<Expression>>),
    Object(Vec<Property>),
    Function(FunctionExpr),
    ArrowFunction(ArrowFunction),
    Class(ClassExpr),
    Unary(UnaryOp, Box<Expression>),
    Binary(BinaryOp, Box<Expression>, Box<Expression>),
    Logical(LogicalOp, Box<Expression>, Box<Expression>),
    Update(UpdateOp, bool, Box<Expression>), // op, prefix, argument
    Assign(AssignOp, Box<Expression>, Box<Expression>),
    DestructuringAssign(Box<Pattern>, Box<Expression>),
    Conditional(Box<Expression>, Box<Expression>, Box<Expression>),
    Call(Box<Expression>, Vec<Expression>),
    New(Box<Expression>, Vec<Expression>),
    Member(Box<Expression>, MemberProperty),
    /// Marks the extent an `?.` short-circuits over.
    OptionalChain(Box<Expression>),
    OptionalMember(Box<Expression>, MemberProperty),
    OptionalCall(Box<Expression>, Vec<Expression>),
    Spread(Box<Expression>),
    Template(TemplateLiteral),
    Typeof(Box<Expression>),
    Void(Box<Expression>),
    Delete(Box<Expression>),
    Sequence(Vec<Expression>),
    SuperCall(Vec<Expression>),
    SuperMember(MemberProperty),
    NewTarget,
}

#[derive(Clone, Debug)]
pub enum MemberProperty {
    Dot(String),
    Computed(Box<Expression>),
}

#[derive(Clone, Debug)]
pub enum Literal {
    Null,
    Boolean(bool),
    Number(f64),
    String(String),
    BigInt(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnaryOp {
    Minus,
    Plus,
    Not,
    BitNot,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Exp,
    Eq,
    NotEq,
    StrictEq,
    StrictNotEq,
    Lt,
    Gt,
    LtEq,
    GtEq,
    LShift,
    RShift,
    URShift,
    BitAnd,
    BitOr,
    BitXor,
    In,
    Instanceof,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
    NullishCoalescing,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UpdateOp {
    Increment,
    Decrement,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AssignOp {
    Assign,
    AddAssign,
    SubAssign,
    MulAssign,
    DivAssign,
    ModAssign,
    ExpAssign,
    LShiftAssign,
    RShiftAssign,
    URShiftAssign,
    BitAndAssign,
    BitOrAssign,
    BitXorAssign,
    LogicalAndAssign,
    LogicalOrAssign,
    NullishAssign,
}

impl AssignOp {
    /// The binary operator a compound assignment applies, if any.
    pub fn binary_op(self) -> Option<BinaryOp> {
        Some(match self {
            AssignOp::AddAssign => BinaryOp::Add,
            AssignOp::SubAssign => BinaryOp::Sub,
            AssignOp::MulAssign => BinaryOp::Mul,
            AssignOp::DivAssign => BinaryOp::Div,
            AssignOp::ModAssign => BinaryOp::Mod,
            AssignOp::ExpAssign => BinaryOp::Exp,
            AssignOp::LShiftAssign => BinaryOp::LShift,
            AssignOp::RShiftAssign => BinaryOp::RShift,
            AssignOp::URShiftAssign => BinaryOp::URShift,
            AssignOp::BitAndAssign => BinaryOp::BitAnd,
            AssignOp::BitOrAssign => BinaryOp::BitOr,
            AssignOp::BitXorAssign => BinaryOp::BitXor,
            AssignOp::Assign
            | AssignOp::LogicalAndAssign
            | AssignOp::LogicalOrAssign
            | AssignOp::NullishAssign => return None,
        })
    }
}

/// An object-literal member. A spread member carries `Expression::Spread`
/// as its value and ignores the key.
#[derive(Clone, Debug)]
pub struct Property {
    pub key: PropertyName,
    pub value: Expression,
    pub kind: PropertyKind,
    pub method: bool,
    pub shorthand: bool,
}

#[derive(Clone, Debug)]
pub enum PropertyName {
    Identifier(String),
    String(String),
    Number(f64),
    Computed(Box<Expression>),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PropertyKind {
    Init,
    Get,
    Set,
}

#[derive(Clone, Debug)]
pub struct IfStatement {
    pub test: Expression,
    pub consequent: Box<Statement>,
    pub alternate: Option<Box<Statement>>,
}

#[derive(Clone, Debug)]
pub struct WhileStatement {
    pub test: Expression,
    pub body: Box<Statement>,
}

#[derive(Clone, Debug)]
pub struct DoWhileStatement {
    pub test: Expression,
    pub body: Box<Statement>,
}

#[derive(Clone, Debug)]
pub struct ForStatement {
    pub init: Option<ForInit>,
    pub test: Option<Expression>,
    pub update: Option<Expression>,
    pub body: Box<Statement>,
}

#[derive(Clone, Debug)]
pub enum ForInit {
    Variable(VariableDeclaration),
    Expression(Expression),
}

#[derive(Clone, Debug)]
pub struct ForInStatement {
    pub left: ForInOfLeft,
    pub right: Expression,
    pub body: Box<Statement>,
}

#[derive(Clone, Debug)]
pub struct ForOfStatement {
    pub left: ForInOfLeft,
    pub right: Expression,
    pub body: Box<Statement>,
}

#[derive(Clone, Debug)]
pub enum ForInOfLeft {
    Variable(VariableDeclaration),
    Pattern(Pattern),
}

#[derive(Clone, Debug)]
pub struct TryStatement {
    pub block: Vec<Statement>,
    pub handler: Option<CatchClause>,
    pub finalizer: Option<Vec<Statement>>,
}

#[derive(Clone, Debug)]
pub struct CatchClause {
    pub param: Option<Pattern>,
    pub body: Vec<Statement>,
}

#[derive(Clone, Debug)]
pub struct SwitchStatement {
    pub discriminant: Expression,
    pub cases: Vec<SwitchCase>,
}

#[derive(Clone, Debug)]
pub struct SwitchCase {
    pub test: Option<Expression>,
    pub consequent: Vec<Statement>,
}

#[derive(Clone, Debug)]
pub struct FunctionDecl {
    pub name: String,
    pub params: Vec<Pattern>,
    pub body: Vec<Statement>,
}

#[derive(Clone, Debug)]
pub struct FunctionExpr {
    pub name: Option<String>,
    pub params: Vec<Pattern>,
    pub body: Vec<Statement>,
}

#[derive(Clone, Debug)]
pub struct ArrowFunction {
    pub params: Vec<Pattern>,
    pub body: ArrowBody,
}

#[derive(Clone, Debug)]
pub enum ArrowBody {
    Expression(Box<Expression>),
    Block(Vec<Statement>),
}

#[derive(Clone, Debug)]
pub struct ClassDecl {
    pub name: String,
    pub super_class: Option<Box<Expression>>,
    pub body: Vec<ClassElement>,
}

#[derive(Clone, Debug)]
pub struct ClassExpr {
    pub name: Option<String>,
    pub super_class: Option<Box<Expression>>,
    pub body: Vec<ClassElement>,
}

#[derive(Clone, Debug)]
pub enum ClassElement {
    Method(ClassMethod),
    Property(ClassProperty),
}

#[derive(Clone, Debug)]
pub struct ClassMethod {
    pub key: PropertyName,
    pub kind: ClassMethodKind,
    pub value: FunctionExpr,
    pub is_static: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClassMethodKind {
    Method,
    Get,
    Set,
    Constructor,
}

#[derive(Clone, Debug)]
pub struct ClassProperty {
    pub key: PropertyName,
    pub value: Option<Expression>,
    pub is_static: bool,
}

#[derive(Clone, Debug)]
pub struct TemplateLiteral {
    pub quasis: Vec<String>,
    pub expressions: Vec<Expression>,
}

impl Expression {
    /// True only for function/class/arrow expressions that have no binding
    /// name of their own.
    pub fn is_anonymous_function_definition(&self) -> bool {
        match self {
            Expression::Function(f) => f.name.as_ref().is_none_or(|n| n.is_empty()),
            Expression::ArrowFunction(_) => true,
            Expression::Class(c) => c.name.as_ref().is_none_or(|n| n.is_empty()),
            _ => false,
        }
    }
}

/// Shorthand constructors for building trees without a parser.
pub mod build {
    use super::*;

    pub fn program(body: Vec<Statement>) -> Program {
        Program { body }
    }

    pub fn num(n: f64) -> Expression {
        Expression::Literal(Literal::Number(n))
    }

    pub fn string(s: &str) -> Expression {
        Expression::Literal(Literal::String(s.to_string()))
    }

    pub fn boolean(b: bool) -> Expression {
        Expression::Literal(Literal::Boolean(b))
    }

    pub fn null() -> Expression {
        Expression::Literal(Literal::Null)
    }

    pub fn bigint(digits: &str) -> Expression {
        Expression::Literal(Literal::BigInt(digits.to_string()))
    }

    pub fn ident(name: &str) -> Expression {
        Expression::Identifier(name.to_string())
    }

    pub fn this() -> Expression {
        Expression::This
    }

    pub fn member(object: Expression, name: &str) -> Expression {
        Expression::Member(Box::new(object), MemberProperty::Dot(name.to_string()))
    }

    pub fn index(object: Expression, key: Expression) -> Expression {
        Expression::Member(Box::new(object), MemberProperty::Computed(Box::new(key)))
    }

    pub fn call(callee: Expression, args: Vec<Expression>) -> Expression {
        Expression::Call(Box::new(callee), args)
    }

    pub fn new(callee: Expression, args: Vec<Expression>) -> Expression {
        Expression::New(Box::new(callee), args)
    }

    pub fn super_call(args: Vec<Expression>) -> Expression {
        Expression::SuperCall(args)
    }

    pub fn binary(op: BinaryOp, left: Expression, right: Expression) -> Expression {
        Expression::Binary(op, Box::new(left), Box::new(right))
    }

    pub fn logical(op: LogicalOp, left: Expression, right: Expression) -> Expression {
        Expression::Logical(op, Box::new(left), Box::new(right))
    }

    pub fn unary(op: UnaryOp, operand: Expression) -> Expression {
        Expression::Unary(op, Box::new(operand))
    }

    pub fn assign(target: Expression, value: Expression) -> Expression {
        Expression::Assign(AssignOp::Assign, Box::new(target), Box::new(value))
    }

    pub fn assign_op(op: AssignOp, target: Expression, value: Expression) -> Expression {
        Expression::Assign(op, Box::new(target), Box::new(value))
    }

    pub fn update(op: UpdateOp, prefix: bool, target: Expression) -> Expression {
        Expression::Update(op, prefix, Box::new(target))
    }

    pub fn array(elements: Vec<Expression>) -> Expression {
        Expression::Array(elements.into_iter().map(Some).collect())
    }

    pub fn object(props: Vec<(&str, Expression)>) -> Expression {
        Expression::Object(
            props
                .into_iter()
                .map(|(key, value)| Property {
                    key: PropertyName::Identifier(key.to_string()),
                    value,
                    kind: PropertyKind::Init,
                    method: false,
                    shorthand: false,
                })
                .collect(),
        )
    }

    pub fn accessor(kind: PropertyKind, key: &str, body: Vec<Statement>, param: Option<&str>) -> Property {
        Property {
            key: PropertyName::Identifier(key.to_string()),
            value: Expression::Function(FunctionExpr {
                name: None,
                params: param.map(|p| vec![Pattern::Identifier(p.to_string())]).unwrap_or_default(),
                body,
            }),
            kind,
            method: true,
            shorthand: false,
        }
    }

    pub fn params(names: &[&str]) -> Vec<Pattern> {
        names.iter().map(|n| Pattern::Identifier(n.to_string())).collect()
    }

    pub fn function_expr(name: Option<&str>, param_names: &[&str], body: Vec<Statement>) -> Expression {
        Expression::Function(FunctionExpr {
            name: name.map(str::to_string),
            params: params(param_names),
            body,
        })
    }

    pub fn arrow(param_names: &[&str], body: Expression) -> Expression {
        Expression::ArrowFunction(ArrowFunction {
            params: params(param_names),
            body: ArrowBody::Expression(Box::new(body)),
        })
    }

    pub fn expr(e: Expression) -> Statement {
        Statement::Expression(e)
    }

    fn declare(kind: VarKind, name: &str, init: Option<Expression>) -> Statement {
        Statement::Variable(VariableDeclaration {
            kind,
            declarations: vec![VariableDeclarator {
                pattern: Pattern::Identifier(name.to_string()),
                init,
            }],
        })
    }

    pub fn var(name: &str, init: Option<Expression>) -> Statement {
        declare(VarKind::Var, name, init)
    }

    pub fn let_(name: &str, init: Option<Expression>) -> Statement {
        declare(VarKind::Let, name, init)
    }

    pub fn const_(name: &str, init: Expression) -> Statement {
        declare(VarKind::Const, name, Some(init))
    }

    pub fn ret(value: Expression) -> Statement {
        Statement::Return(Some(value))
    }

    pub fn throw(value: Expression) -> Statement {
        Statement::Throw(value)
    }

    pub fn block(body: Vec<Statement>) -> Statement {
        Statement::Block(body)
    }

    pub fn if_(test: Expression, consequent: Statement, alternate: Option<Statement>) -> Statement {
        Statement::If(IfStatement {
            test,
            consequent: Box::new(consequent),
            alternate: alternate.map(Box::new),
        })
    }

    pub fn while_(test: Expression, body: Statement) -> Statement {
        Statement::While(WhileStatement {
            test,
            body: Box::new(body),
        })
    }

    pub fn try_(
        block: Vec<Statement>,
        handler: Option<(&str, Vec<Statement>)>,
        finalizer: Option<Vec<Statement>>,
    ) -> Statement {
        Statement::Try(TryStatement {
            block,
            handler: handler.map(|(param, body)| CatchClause {
                param: Some(Pattern::Identifier(param.to_string())),
                body,
            }),
            finalizer,
        })
    }

    pub fn function(name: &str, param_names: &[&str], body: Vec<Statement>) -> Statement {
        Statement::FunctionDeclaration(FunctionDecl {
            name: name.to_string(),
            params: params(param_names),
            body,
        })
    }

    pub fn method(name: &str, param_names: &[&str], body: Vec<Statement>) -> ClassElement {
        ClassElement::Method(ClassMethod {
            key: PropertyName::Identifier(name.to_string()),
            kind: ClassMethodKind::Method,
            value: FunctionExpr {
                name: None,
                params: params(param_names),
                body,
            },
            is_static: false,
        })
    }

    pub fn constructor(param_names: &[&str], body: Vec<Statement>) -> ClassElement {
        ClassElement::Method(ClassMethod {
            key: PropertyName::Identifier("constructor".to_string()),
            kind: ClassMethodKind::Constructor,
            value: FunctionExpr {
                name: None,
                params: params(param_names),
                body,
            },
            is_static: false,
        })
    }

    pub fn field(name: &str, value: Option<Expression>) -> ClassElement {
        ClassElement::Property(ClassProperty {
            key: PropertyName::Identifier(name.to_string()),
            value,
            is_static: false,
        })
    }

    pub fn class(name: &str, super_class: Option<Expression>, body: Vec<ClassElement>) -> Statement {
        Statement::ClassDeclaration(ClassDecl {
            name: name.to_string(),
            super_class: super_class.map(Box::new),
            body,
        })
    }
}
