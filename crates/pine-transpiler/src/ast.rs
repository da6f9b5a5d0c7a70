//! ast.rs — arbre syntaxique typé
//!
//! Arbre strict (pas de cycles) : chaque enfant est possédé par son parent
//! via `Box` / `Vec`. Le générateur ne fait que l'emprunter.
//! Chaque instruction porte sa ligne source (pour les erreurs de génération).

#[cfg(feature = "serde")]
use serde::Serialize;

/* ───────────────────────── Programme ───────────────────────── */

#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct Program {
    /// Valeur de la directive `//@version=N`, si présente.
    pub version: Option<u32>,
    pub body: Vec<Stmt>,
}

/* ───────────────────────── Instructions ───────────────────────── */

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct Stmt {
    pub line: usize,
    pub kind: StmtKind,
}

impl Stmt {
    pub fn new(line: usize, kind: StmtKind) -> Self {
        Self { line, kind }
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize), serde(tag = "type"))]
pub enum StmtKind {
    StudyDeclaration(StudyDeclaration),
    InputDeclaration(InputDeclaration),
    VariableDeclaration(VariableDeclaration),
    /// `var a = 1, b = 2, plot(a)` : déclarations enchaînées.
    MultiDeclaration { declarations: Vec<Stmt> },
    DestructuringAssignment { targets: Vec<String>, value: Expr },
    Assignment(Assignment),
    IfStatement(IfStatement),
    ForStatement(ForStatement),
    ForInStatement(ForInStatement),
    WhileStatement { condition: Expr, body: Vec<Stmt> },
    SwitchStatement(Switch),
    FunctionDeclaration(FunctionDeclaration),
    TypeDeclaration(TypeDeclaration),
    ImportDeclaration { path: String, alias: Option<String> },
    ReturnStatement { value: Option<Expr> },
    BreakStatement,
    ContinueStatement,
    /// Instructions enchaînées par des virgules (`a := 1, b := 2`).
    Block { statements: Vec<Stmt> },
    ExpressionStatement { expression: Expr },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize), serde(rename_all = "lowercase"))]
pub enum StudyKind {
    Indicator,
    Strategy,
    Study,
}

impl StudyKind {
    pub fn as_str(self) -> &'static str {
        match self {
            StudyKind::Indicator => "indicator",
            StudyKind::Strategy => "strategy",
            StudyKind::Study => "study",
        }
    }
}

/// `indicator("Titre", overlay = true)`
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct StudyDeclaration {
    pub kind: StudyKind,
    pub title: Option<String>,
    pub arguments: Vec<Argument>,
}

/// `length = input.int(14, "Période")`
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct InputDeclaration {
    pub name: String,
    /// Variante d'entrée : `int`, `float`, `source`… (`None` pour `input(...)`).
    pub input_kind: Option<String>,
    pub declared_type: Option<String>,
    /// L'appel complet, conservé tel quel pour la génération.
    pub call: Expr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize), serde(rename_all = "lowercase"))]
pub enum Persistence {
    /// Déclaration ordinaire (réévaluée à chaque barre).
    None,
    /// `var` : initialisée une seule fois, persistante entre barres.
    Var,
    /// `varip` : comme `var`, persistante aussi en intra-barre.
    Varip,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct VariableDeclaration {
    pub persistence: Persistence,
    pub declared_type: Option<String>,
    pub name: String,
    pub value: Expr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub enum AssignOp {
    /// `=`
    Define,
    /// `:=`
    Reassign,
    Add,
    Sub,
    Mul,
    Div,
}

impl AssignOp {
    pub fn is_compound(self) -> bool {
        matches!(self, AssignOp::Add | AssignOp::Sub | AssignOp::Mul | AssignOp::Div)
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct Assignment {
    pub target: Expr,
    pub op: AssignOp,
    pub value: Expr,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct IfStatement {
    pub condition: Expr,
    pub then_branch: Vec<Stmt>,
    /// `else` simple ou `else if` (un seul `IfStatement` imbriqué).
    pub else_branch: Option<Vec<Stmt>>,
}

/// `for i = a to b [by step]`
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct ForStatement {
    pub variable: String,
    pub start: Expr,
    pub end: Expr,
    pub step: Option<Expr>,
    pub body: Vec<Stmt>,
}

/// `for x in coll` / `for [i, x] in coll`
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct ForInStatement {
    pub bindings: Vec<String>,
    pub iterable: Expr,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct Param {
    pub name: String,
    pub declared_type: Option<String>,
    pub default: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct FunctionDeclaration {
    pub name: String,
    pub params: Vec<Param>,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct TypeField {
    pub field_type: String,
    pub name: String,
    pub default: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct TypeDeclaration {
    pub name: String,
    pub fields: Vec<TypeField>,
}

/* ───────────────────────── Switch ───────────────────────── */

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct SwitchArm {
    /// `None` = bras joker (`=> valeur`).
    pub pattern: Option<Expr>,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct Switch {
    pub subject: Option<Box<Expr>>,
    pub arms: Vec<SwitchArm>,
}

/* ───────────────────────── Expressions ───────────────────────── */

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize), serde(tag = "type"))]
pub enum Expr {
    Literal { value: Literal },
    Identifier { name: String },
    BinaryExpression { op: BinaryOp, left: Box<Expr>, right: Box<Expr> },
    UnaryExpression { op: UnaryOp, operand: Box<Expr> },
    TernaryExpression { condition: Box<Expr>, then_expr: Box<Expr>, else_expr: Box<Expr> },
    /// `if` en position d'expression, forme bloc (`x = if c` + bloc indenté).
    IfExpression { condition: Box<Expr>, then_branch: Vec<Stmt>, else_branch: Option<Vec<Stmt>> },
    FunctionCall { callee: Box<Expr>, arguments: Vec<Argument> },
    /// `x[n]` : valeur de `x` il y a `n` barres.
    ArrayAccess { target: Box<Expr>, offset: Box<Expr> },
    PropertyAccess { object: Box<Expr>, property: String },
    ArrayLiteral { elements: Vec<Expr> },
    ObjectLiteral { properties: Vec<(String, Expr)> },
    SwitchExpression(Switch),
    SequenceExpression { expressions: Vec<Expr> },
}

impl Expr {
    pub fn ident(name: impl Into<String>) -> Self {
        Expr::Identifier { name: name.into() }
    }

    /// Nom pointé complet (`ta.sma`, `strategy.entry`) si l'expression n'est
    /// faite que d'identifiants et d'accès membres.
    pub fn dotted_name(&self) -> Option<String> {
        match self {
            Expr::Identifier { name } => Some(name.clone()),
            Expr::PropertyAccess { object, property } => {
                let mut base = object.dotted_name()?;
                base.push('.');
                base.push_str(property);
                Some(base)
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub enum Literal {
    Number(f64),
    String(String),
    Bool(bool),
    Na,
    /// `#RRGGBB` ou `#RRGGBBAA`
    Color(String),
}

/// Argument d'appel, positionnel (`name == None`) ou nommé (`title = "x"`).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct Argument {
    pub name: Option<String>,
    pub value: Expr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub enum BinaryOp {
    Or,
    And,
    BitOr,
    BitXor,
    BitAnd,
    Eq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

impl BinaryOp {
    /// Opérateur JavaScript correspondant.
    pub fn js(self) -> &'static str {
        match self {
            BinaryOp::Or => "||",
            BinaryOp::And => "&&",
            BinaryOp::BitOr => "|",
            BinaryOp::BitXor => "^",
            BinaryOp::BitAnd => "&",
            BinaryOp::Eq => "===",
            BinaryOp::NotEq => "!==",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub enum UnaryOp {
    Not,
    Neg,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dotted_name_flattens_member_chains() {
        let e = Expr::PropertyAccess {
            object: Box::new(Expr::PropertyAccess { object: Box::new(Expr::ident("a")), property: "b".into() }),
            property: "c".into(),
        };
        assert_eq!(e.dotted_name().as_deref(), Some("a.b.c"));

        let call = Expr::FunctionCall { callee: Box::new(Expr::ident("f")), arguments: vec![] };
        let e = Expr::PropertyAccess { object: Box::new(call), property: "x".into() };
        assert_eq!(e.dotted_name(), None);
    }

    #[test]
    fn operators_map_to_strict_js() {
        assert_eq!(BinaryOp::Eq.js(), "===");
        assert_eq!(BinaryOp::NotEq.js(), "!==");
        assert_eq!(BinaryOp::And.js(), "&&");
        assert!(AssignOp::Add.is_compound());
        assert!(!AssignOp::Reassign.is_compound());
    }
}
