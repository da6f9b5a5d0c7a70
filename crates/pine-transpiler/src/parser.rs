//! parser.rs — Descente récursive + précédence des opérateurs
//!
//! Grammaire (précédence croissante) :
//!   ternaire `? :` → `or`/`||` → `and`/`&&` → `|` → `^` → `&`
//!   → `==` `!=` → `<` `<=` `>` `>=` → `+` `-` → `*` `/` `%`
//!   → unaire (`not`, `!`, `-`, `+`) → postfixe (appel, `[n]`, `.membre`)
//!   → primaire.
//!
//! Désambiguïsations par anticipation :
//! - affectation : `nom(.membre|[..]|(..))* (= | := | += | -= | *= | /=)` ;
//! - déclaration typée : `type nom = …`, avec retour arrière si ce n'en est pas une ;
//! - fonction : `nom(…)` suivi (éventuellement après saut de ligne) de `=>` ;
//! - déstructuration : `[…]` suivi de `=` ou `:=`.
//!
//! Les `Newline` séparent les instructions : le curseur ne les saute jamais
//! implicitement. Une ligne indentée qui commence par `?`, `:` ou un opérateur
//! binaire prolonge l'expression en cours ; l'indentation ainsi « absorbée »
//! est rendue au `Dedent` correspondant.
//!
//! Erreur : première attente non satisfaite → `ParseError`, sans reprise.

use crate::ast::{
    Argument, AssignOp, Assignment, BinaryOp, Expr, ForInStatement, ForStatement, FunctionDeclaration,
    IfStatement, InputDeclaration, Literal, Param, Persistence, Program, Stmt, StmtKind, StudyDeclaration,
    StudyKind, Switch, SwitchArm, TypeDeclaration, TypeField, UnaryOp, VariableDeclaration,
};
use crate::diagnostics::ParseError;
use crate::lexer::{Keyword, Token, TokenKind};

type PResult<T> = Result<T, ParseError>;

/// Raccourci : construit l'AST d'un flux de jetons complet.
pub fn parse(tokens: Vec<Token>) -> PResult<Program> {
    Parser::new(tokens).parse_program()
}

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    /// Niveaux d'indentation ouverts par une ligne de continuation.
    absorbed: usize,
    version: Option<u32>,
    /// Corps en ligne d'un bras de switch : pas de déclaration de fonction.
    arm_inline: bool,
}

/* ───────────────────────── Tables d'opérateurs ───────────────────────── */

const OR_OPS: &[(TokenKind, BinaryOp)] = &[(TokenKind::Keyword(Keyword::Or), BinaryOp::Or), (TokenKind::OrOr, BinaryOp::Or)];
const AND_OPS: &[(TokenKind, BinaryOp)] = &[(TokenKind::Keyword(Keyword::And), BinaryOp::And), (TokenKind::AndAnd, BinaryOp::And)];
const BITOR_OPS: &[(TokenKind, BinaryOp)] = &[(TokenKind::Pipe, BinaryOp::BitOr)];
const BITXOR_OPS: &[(TokenKind, BinaryOp)] = &[(TokenKind::Caret, BinaryOp::BitXor)];
const BITAND_OPS: &[(TokenKind, BinaryOp)] = &[(TokenKind::Amp, BinaryOp::BitAnd)];
const EQUALITY_OPS: &[(TokenKind, BinaryOp)] = &[(TokenKind::EqEq, BinaryOp::Eq), (TokenKind::NotEq, BinaryOp::NotEq)];
const COMPARISON_OPS: &[(TokenKind, BinaryOp)] = &[
    (TokenKind::Lt, BinaryOp::Lt),
    (TokenKind::Le, BinaryOp::Le),
    (TokenKind::Gt, BinaryOp::Gt),
    (TokenKind::Ge, BinaryOp::Ge),
];
const ADDITIVE_OPS: &[(TokenKind, BinaryOp)] = &[(TokenKind::Plus, BinaryOp::Add), (TokenKind::Minus, BinaryOp::Sub)];
const MULTIPLICATIVE_OPS: &[(TokenKind, BinaryOp)] = &[
    (TokenKind::Star, BinaryOp::Mul),
    (TokenKind::Slash, BinaryOp::Div),
    (TokenKind::Percent, BinaryOp::Rem),
];

fn assign_op(kind: TokenKind) -> Option<AssignOp> {
    match kind {
        TokenKind::Assign => Some(AssignOp::Define),
        TokenKind::ColonAssign => Some(AssignOp::Reassign),
        TokenKind::PlusAssign => Some(AssignOp::Add),
        TokenKind::MinusAssign => Some(AssignOp::Sub),
        TokenKind::StarAssign => Some(AssignOp::Mul),
        TokenKind::SlashAssign => Some(AssignOp::Div),
        _ => None,
    }
}

impl Parser {
    pub fn new(mut tokens: Vec<Token>) -> Self {
        if tokens.last().map_or(true, |t| t.kind != TokenKind::Eof) {
            let line = tokens.last().map_or(1, |t| t.line);
            tokens.push(Token { kind: TokenKind::Eof, text: String::new(), line, column: 0 });
        }
        Self { tokens, pos: 0, absorbed: 0, version: None, arm_inline: false }
    }

    pub fn parse_program(mut self) -> PResult<Program> {
        let body = self.parse_statements(false)?;
        Ok(Program { version: self.version, body })
    }

    /* ───────────── Listes d'instructions & blocs ───────────── */

    /// Instructions jusqu'à `Eof` (ou jusqu'au `Dedent` fermant si `in_block`).
    /// Le `Dedent` fermant n'est pas consommé.
    fn parse_statements(&mut self, in_block: bool) -> PResult<Vec<Stmt>> {
        let mut out = Vec::new();
        loop {
            match self.kind() {
                TokenKind::Newline => self.pos += 1,
                TokenKind::Eof => {
                    if in_block {
                        return Err(self.error_here("fin de bloc"));
                    }
                    return Ok(out);
                }
                TokenKind::Dedent => {
                    if self.absorbed > 0 {
                        self.absorbed -= 1;
                        self.pos += 1;
                    } else if in_block {
                        return Ok(out);
                    } else {
                        self.pos += 1;
                    }
                }
                TokenKind::Indent => {
                    // Indentation sans bloc ouvrant : on aplatit.
                    self.pos += 1;
                    let inner = self.parse_statements(true)?;
                    self.expect(TokenKind::Dedent, "fin de bloc")?;
                    out.extend(inner);
                }
                TokenKind::Keyword(Keyword::Version) => self.parse_version(),
                _ => out.push(self.parse_statement()?),
            }
        }
    }

    /// Corps d'un `if`/`for`/`while`/fonction/bras de switch :
    /// instruction sur la même ligne, ou bloc indenté.
    fn parse_block_body(&mut self) -> PResult<Vec<Stmt>> {
        if self.at(TokenKind::Newline) || self.at(TokenKind::Indent) {
            self.skip_newlines();
            self.expect(TokenKind::Indent, "bloc indenté")?;
            let body = self.parse_statements(true)?;
            self.expect(TokenKind::Dedent, "fin de bloc")?;
            return Ok(body);
        }
        Ok(vec![self.parse_statement()?])
    }

    fn parse_version(&mut self) {
        self.pos += 1;
        if self.eat(TokenKind::Assign) && self.at(TokenKind::Number) {
            let text = self.advance().text;
            if self.version.is_none() {
                self.version = text.parse().ok();
            }
        }
    }

    /* ───────────── Instructions ───────────── */

    fn parse_statement(&mut self) -> PResult<Stmt> {
        let line = self.line();
        match self.kind() {
            TokenKind::Keyword(Keyword::Import) => self.parse_import(),
            TokenKind::Keyword(Keyword::Type) => self.parse_type_declaration(),
            TokenKind::LBracket if self.is_destructuring_start() => self.parse_destructuring(),
            TokenKind::Keyword(Keyword::Var | Keyword::Varip) => self.parse_var_statement(),
            TokenKind::Keyword(Keyword::If) => self.parse_if_statement(),
            TokenKind::Keyword(Keyword::For) => self.parse_for(),
            TokenKind::Keyword(Keyword::While) => {
                self.pos += 1;
                let condition = self.parse_expression()?;
                let body = self.parse_block_body()?;
                Ok(Stmt::new(line, StmtKind::WhileStatement { condition, body }))
            }
            TokenKind::Keyword(Keyword::Break) => {
                self.pos += 1;
                Ok(Stmt::new(line, StmtKind::BreakStatement))
            }
            TokenKind::Keyword(Keyword::Continue) => {
                self.pos += 1;
                Ok(Stmt::new(line, StmtKind::ContinueStatement))
            }
            TokenKind::Keyword(Keyword::Return) => {
                self.pos += 1;
                let value = if self.at_statement_end() { None } else { Some(self.parse_expression()?) };
                Ok(Stmt::new(line, StmtKind::ReturnStatement { value }))
            }
            TokenKind::Keyword(Keyword::Indicator | Keyword::Strategy | Keyword::Study) => self.parse_study(),
            TokenKind::Keyword(Keyword::Switch) => {
                let switch = self.parse_switch()?;
                Ok(Stmt::new(line, StmtKind::SwitchStatement(switch)))
            }
            TokenKind::Ident if !self.arm_inline && self.is_function_start() => self.parse_function(),
            TokenKind::Ident if self.is_typed_declaration_start() => {
                if let Some((declared_type, name)) = self.try_declaration_head() {
                    let value = self.parse_expression()?;
                    let first = make_declaration(line, Persistence::None, declared_type, name, value);
                    return self.finish_chain(line, first);
                }
                let first = self.parse_simple_statement()?;
                self.finish_chain(line, first)
            }
            _ => {
                let first = self.parse_simple_statement()?;
                self.finish_chain(line, first)
            }
        }
    }

    /// Affectation ou instruction-expression (un seul maillon de chaîne).
    fn parse_simple_statement(&mut self) -> PResult<Stmt> {
        let line = self.line();
        if !self.is_assignment_start() {
            let expression = self.parse_expression()?;
            return Ok(Stmt::new(line, StmtKind::ExpressionStatement { expression }));
        }

        let target = self.parse_postfix()?;
        if !matches!(target, Expr::Identifier { .. } | Expr::PropertyAccess { .. }) {
            return Err(ParseError::new(line, "cible d'affectation invalide (identifiant ou membre attendu)"));
        }
        let op_tok = self.advance();
        let op = assign_op(op_tok.kind).ok_or_else(|| ParseError::new(op_tok.line, "opérateur d'affectation attendu"))?;
        let value = self.parse_expression()?;

        if op == AssignOp::Define {
            if let (Expr::Identifier { name }, Some(input_kind)) = (&target, input_kind(&value)) {
                return Ok(Stmt::new(
                    line,
                    StmtKind::InputDeclaration(InputDeclaration {
                        name: name.clone(),
                        input_kind,
                        declared_type: None,
                        call: value,
                    }),
                ));
            }
        }
        Ok(Stmt::new(line, StmtKind::Assignment(Assignment { target, op, value })))
    }

    /// Prolonge une instruction par `, autre, autre…`.
    fn finish_chain(&mut self, line: usize, first: Stmt) -> PResult<Stmt> {
        if !self.at(TokenKind::Comma) {
            return Ok(first);
        }
        let is_declaration = matches!(first.kind, StmtKind::VariableDeclaration(_));
        let mut items = vec![first];
        while self.eat(TokenKind::Comma) {
            let item = if self.at_keyword(Keyword::Var) || self.at_keyword(Keyword::Varip) {
                self.parse_var_item(Persistence::None)?
            } else if self.at(TokenKind::Ident) && self.is_typed_declaration_start() {
                let item_line = self.line();
                match self.try_declaration_head() {
                    Some((declared_type, name)) => {
                        let value = self.parse_expression()?;
                        make_declaration(item_line, Persistence::None, declared_type, name, value)
                    }
                    None => self.parse_simple_statement()?,
                }
            } else {
                self.parse_simple_statement()?
            };
            items.push(item);
        }

        if is_declaration {
            return Ok(Stmt::new(line, StmtKind::MultiDeclaration { declarations: items }));
        }
        if items.iter().all(|s| matches!(s.kind, StmtKind::ExpressionStatement { .. })) {
            let expressions = items
                .into_iter()
                .filter_map(|s| match s.kind {
                    StmtKind::ExpressionStatement { expression } => Some(expression),
                    _ => None,
                })
                .collect();
            return Ok(Stmt::new(
                line,
                StmtKind::ExpressionStatement { expression: Expr::SequenceExpression { expressions } },
            ));
        }
        Ok(Stmt::new(line, StmtKind::Block { statements: items }))
    }

    /// `var [type] nom = expr [, …]`
    fn parse_var_statement(&mut self) -> PResult<Stmt> {
        let line = self.line();
        let first = self.parse_var_item(Persistence::None)?;
        let inherited = match &first.kind {
            StmtKind::VariableDeclaration(d) => d.persistence,
            _ => Persistence::None,
        };
        if !self.at(TokenKind::Comma) {
            return Ok(first);
        }

        let mut declarations = vec![first];
        while self.eat(TokenKind::Comma) {
            let item = if self.at_keyword(Keyword::Var) || self.at_keyword(Keyword::Varip) {
                self.parse_var_item(inherited)?
            } else if self.at(TokenKind::Ident) && self.kind_at(1) == TokenKind::Assign {
                let item_line = self.line();
                let name = self.advance().text;
                self.pos += 1;
                let value = self.parse_expression()?;
                make_declaration(item_line, inherited, None, name, value)
            } else if self.at(TokenKind::Ident) && self.is_typed_declaration_start() {
                let item_line = self.line();
                match self.try_declaration_head() {
                    Some((declared_type, name)) => {
                        let value = self.parse_expression()?;
                        make_declaration(item_line, inherited, declared_type, name, value)
                    }
                    None => self.parse_simple_statement()?,
                }
            } else {
                self.parse_simple_statement()?
            };
            declarations.push(item);
        }
        Ok(Stmt::new(line, StmtKind::MultiDeclaration { declarations }))
    }

    /// Un maillon `var|varip [type] nom = expr` (le mot-clé est optionnel si hérité).
    fn parse_var_item(&mut self, inherited: Persistence) -> PResult<Stmt> {
        let line = self.line();
        let persistence = match self.kind() {
            TokenKind::Keyword(Keyword::Var) => {
                self.pos += 1;
                Persistence::Var
            }
            TokenKind::Keyword(Keyword::Varip) => {
                self.pos += 1;
                Persistence::Varip
            }
            _ => inherited,
        };

        let (declared_type, name) = if self.at(TokenKind::Ident) && self.kind_at(1) == TokenKind::Assign {
            let name = self.advance().text;
            self.pos += 1;
            (None, name)
        } else {
            self.try_declaration_head()
                .ok_or_else(|| self.error_here("déclaration `[type] nom = valeur`"))?
        };
        let value = self.parse_expression()?;
        Ok(make_declaration(line, persistence, declared_type, name, value))
    }

    fn parse_if_statement(&mut self) -> PResult<Stmt> {
        let line = self.line();
        self.expect_keyword(Keyword::If)?;
        let condition = self.parse_expression()?;
        let then_branch = self.parse_block_body()?;
        let else_branch = self.parse_else(|p| p.parse_if_statement())?;
        Ok(Stmt::new(line, StmtKind::IfStatement(IfStatement { condition, then_branch, else_branch })))
    }

    /// `else` éventuel ; `else if` délègue à `nested` (instruction ou expression).
    fn parse_else(&mut self, nested: impl FnOnce(&mut Self) -> PResult<Stmt>) -> PResult<Option<Vec<Stmt>>> {
        let save = self.pos;
        self.skip_newlines();
        if !self.at_keyword(Keyword::Else) {
            self.pos = save;
            return Ok(None);
        }
        self.pos += 1;
        if self.at_keyword(Keyword::If) {
            return Ok(Some(vec![nested(self)?]));
        }
        Ok(Some(self.parse_block_body()?))
    }

    fn parse_for(&mut self) -> PResult<Stmt> {
        let line = self.line();
        self.expect_keyword(Keyword::For)?;

        // for [i, x] in coll
        if self.eat(TokenKind::LBracket) {
            let bindings = self.parse_name_list(TokenKind::RBracket)?;
            self.expect_keyword(Keyword::In)?;
            let iterable = self.parse_expression()?;
            let body = self.parse_block_body()?;
            return Ok(Stmt::new(line, StmtKind::ForInStatement(ForInStatement { bindings, iterable, body })));
        }

        let variable = self.expect(TokenKind::Ident, "variable de boucle")?.text;
        if self.at_keyword(Keyword::In) {
            self.pos += 1;
            let iterable = self.parse_expression()?;
            let body = self.parse_block_body()?;
            return Ok(Stmt::new(
                line,
                StmtKind::ForInStatement(ForInStatement { bindings: vec![variable], iterable, body }),
            ));
        }

        if !self.eat(TokenKind::Assign) && !self.eat(TokenKind::ColonAssign) {
            return Err(self.error_here("'=' ou 'in'"));
        }
        let start = self.parse_expression()?;
        self.expect_keyword(Keyword::To)?;
        let end = self.parse_expression()?;
        let step = if self.at_keyword(Keyword::By) {
            self.pos += 1;
            Some(self.parse_expression()?)
        } else {
            None
        };
        let body = self.parse_block_body()?;
        Ok(Stmt::new(line, StmtKind::ForStatement(ForStatement { variable, start, end, step, body })))
    }

    fn parse_study(&mut self) -> PResult<Stmt> {
        let tok = self.advance();
        let kind = match tok.kind {
            TokenKind::Keyword(Keyword::Strategy) => StudyKind::Strategy,
            TokenKind::Keyword(Keyword::Study) => StudyKind::Study,
            _ => StudyKind::Indicator,
        };
        self.expect(TokenKind::LParen, "'('")?;
        let arguments = self.parse_arguments()?;

        let title = arguments
            .iter()
            .find(|a| a.name.is_none() || a.name.as_deref() == Some("title"))
            .and_then(|a| match &a.value {
                Expr::Literal { value: Literal::String(s) } => Some(s.clone()),
                _ => None,
            });
        Ok(Stmt::new(tok.line, StmtKind::StudyDeclaration(StudyDeclaration { kind, title, arguments })))
    }

    fn parse_import(&mut self) -> PResult<Stmt> {
        let line = self.line();
        self.pos += 1;
        let mut path = String::new();
        while !self.at_keyword(Keyword::As) && !self.at_statement_end() {
            path.push_str(&self.advance().text);
        }
        if path.is_empty() {
            return Err(self.error_here("chemin de bibliothèque"));
        }
        let alias = if self.at_keyword(Keyword::As) {
            self.pos += 1;
            Some(self.expect(TokenKind::Ident, "alias d'import")?.text)
        } else {
            None
        };
        Ok(Stmt::new(line, StmtKind::ImportDeclaration { path, alias }))
    }

    fn parse_type_declaration(&mut self) -> PResult<Stmt> {
        let line = self.line();
        self.pos += 1;
        let name = self.expect(TokenKind::Ident, "nom de type")?.text;
        self.skip_newlines();
        self.expect(TokenKind::Indent, "corps de type indenté")?;

        let mut fields = Vec::new();
        loop {
            self.skip_newlines();
            if self.at(TokenKind::Dedent) || self.at(TokenKind::Eof) {
                break;
            }
            if self.at_keyword(Keyword::Varip) {
                self.pos += 1;
            }
            let field_type = self.parse_type_ref().ok_or_else(|| self.error_here("type de champ"))?;
            let field_name = self.expect(TokenKind::Ident, "nom de champ")?.text;
            let default = if self.eat(TokenKind::Assign) { Some(self.parse_expression()?) } else { None };
            fields.push(TypeField { field_type, name: field_name, default });
        }
        self.expect(TokenKind::Dedent, "fin du corps de type")?;
        Ok(Stmt::new(line, StmtKind::TypeDeclaration(TypeDeclaration { name, fields })))
    }

    fn parse_destructuring(&mut self) -> PResult<Stmt> {
        let line = self.line();
        self.expect(TokenKind::LBracket, "'['")?;
        let targets = self.parse_name_list(TokenKind::RBracket)?;
        if !self.eat(TokenKind::Assign) && !self.eat(TokenKind::ColonAssign) {
            return Err(self.error_here("'='"));
        }
        let value = self.parse_expression()?;
        Ok(Stmt::new(line, StmtKind::DestructuringAssignment { targets, value }))
    }

    /// `a, b, c` jusqu'au délimiteur fermant (consommé).
    fn parse_name_list(&mut self, close: TokenKind) -> PResult<Vec<String>> {
        let mut names = Vec::new();
        while !self.eat(close) {
            names.push(self.expect(TokenKind::Ident, "identifiant")?.text);
            if !self.eat(TokenKind::Comma) {
                self.expect(close, "']'")?;
                break;
            }
        }
        Ok(names)
    }

    fn parse_function(&mut self) -> PResult<Stmt> {
        let line = self.line();
        while self.at(TokenKind::Ident) && self.kind_at(1) == TokenKind::Ident {
            // modificateurs `export` / `method`
            self.pos += 1;
        }
        let name = self.expect(TokenKind::Ident, "nom de fonction")?.text;
        self.expect(TokenKind::LParen, "'('")?;

        let mut params = Vec::new();
        while !self.eat(TokenKind::RParen) {
            let declared_type = if matches!(self.kind_at(1), TokenKind::Ident | TokenKind::Lt | TokenKind::LBracket) {
                Some(self.parse_type_ref().ok_or_else(|| self.error_here("type de paramètre"))?)
            } else {
                None
            };
            let pname = self.expect(TokenKind::Ident, "nom de paramètre")?.text;
            let default = if self.eat(TokenKind::Assign) { Some(self.parse_expression()?) } else { None };
            params.push(Param { name: pname, declared_type, default });
            if !self.eat(TokenKind::Comma) {
                self.expect(TokenKind::RParen, "')'")?;
                break;
            }
        }

        // `=>` peut se trouver sur la ligne suivante
        while self.at(TokenKind::Newline) || self.at(TokenKind::Indent) {
            if self.at(TokenKind::Indent) {
                self.absorbed += 1;
            }
            self.pos += 1;
        }
        self.expect(TokenKind::Arrow, "'=>'")?;
        let body = self.parse_block_body()?;
        Ok(Stmt::new(line, StmtKind::FunctionDeclaration(FunctionDeclaration { name, params, body })))
    }

    /// `switch [sujet]` + bras indentés `motif => corps` / `=> corps`.
    fn parse_switch(&mut self) -> PResult<Switch> {
        self.expect_keyword(Keyword::Switch)?;
        let subject = if self.at(TokenKind::Newline) || self.at(TokenKind::Indent) || self.at(TokenKind::Eof) {
            None
        } else {
            Some(Box::new(self.parse_expression()?))
        };
        self.skip_newlines();
        self.expect(TokenKind::Indent, "corps de switch indenté")?;

        let mut arms = Vec::new();
        let mut wildcard_line = None;
        loop {
            self.skip_newlines();
            match self.kind() {
                TokenKind::Dedent if self.absorbed > 0 => {
                    self.absorbed -= 1;
                    self.pos += 1;
                    continue;
                }
                TokenKind::Dedent | TokenKind::Eof => break,
                _ => {}
            }
            let arm_line = self.line();
            if let Some(line) = wildcard_line {
                return Err(ParseError::new(line, "le bras joker `=>` doit être le dernier du switch"));
            }
            let pattern = if self.eat(TokenKind::Arrow) {
                wildcard_line = Some(arm_line);
                None
            } else {
                let p = self.parse_expression()?;
                self.expect(TokenKind::Arrow, "'=>'")?;
                Some(p)
            };
            self.arm_inline = !(self.at(TokenKind::Newline) || self.at(TokenKind::Indent));
            let body = self.parse_block_body();
            self.arm_inline = false;
            arms.push(SwitchArm { pattern, body: body? });
        }
        self.expect(TokenKind::Dedent, "fin du switch")?;
        Ok(Switch { subject, arms })
    }

    /* ───────────── Anticipations ───────────── */

    fn is_assignment_start(&self) -> bool {
        if self.kind() != TokenKind::Ident {
            return false;
        }
        let mut i = self.pos + 1;
        loop {
            match self.kind_at_abs(i) {
                TokenKind::Dot if self.kind_at_abs(i + 1) == TokenKind::Ident => i += 2,
                TokenKind::LBracket => match self.matching(i, TokenKind::LBracket, TokenKind::RBracket) {
                    Some(j) => i = j + 1,
                    None => return false,
                },
                TokenKind::LParen => match self.matching(i, TokenKind::LParen, TokenKind::RParen) {
                    Some(j) => i = j + 1,
                    None => return false,
                },
                k => return assign_op(k).is_some(),
            }
        }
    }

    fn is_typed_declaration_start(&self) -> bool {
        self.kind() == TokenKind::Ident && matches!(self.kind_at(1), TokenKind::Ident | TokenKind::Lt | TokenKind::LBracket)
    }

    fn is_function_start(&self) -> bool {
        let mut i = self.pos;
        while self.kind_at_abs(i) == TokenKind::Ident && self.kind_at_abs(i + 1) == TokenKind::Ident {
            i += 1;
        }
        if self.kind_at_abs(i) != TokenKind::Ident || self.kind_at_abs(i + 1) != TokenKind::LParen {
            return false;
        }
        let Some(close) = self.matching(i + 1, TokenKind::LParen, TokenKind::RParen) else {
            return false;
        };
        // `=>` sur la même ligne, ou en tête d'une ligne plus indentée
        let mut k = close + 1;
        if self.kind_at_abs(k) == TokenKind::Arrow {
            return true;
        }
        while self.kind_at_abs(k) == TokenKind::Newline {
            k += 1;
        }
        k > close + 1 && self.kind_at_abs(k) == TokenKind::Indent && self.kind_at_abs(k + 1) == TokenKind::Arrow
    }

    fn is_destructuring_start(&self) -> bool {
        self.matching(self.pos, TokenKind::LBracket, TokenKind::RBracket)
            .is_some_and(|j| matches!(self.kind_at_abs(j + 1), TokenKind::Assign | TokenKind::ColonAssign))
    }

    /// Index du délimiteur fermant équilibré à partir de `open_at`.
    fn matching(&self, open_at: usize, open: TokenKind, close: TokenKind) -> Option<usize> {
        let mut depth = 0usize;
        for (i, tok) in self.tokens.iter().enumerate().skip(open_at) {
            if tok.kind == open {
                depth += 1;
            } else if tok.kind == close {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            } else if tok.kind == TokenKind::Eof {
                return None;
            }
        }
        None
    }

    /// `[type] nom =` avec retour arrière ; consomme le `=` en cas de succès.
    fn try_declaration_head(&mut self) -> Option<(Option<String>, String)> {
        let start = self.pos;
        if let Some(ty) = self.parse_type_ref() {
            if self.at(TokenKind::Ident) && matches!(self.kind_at(1), TokenKind::Assign | TokenKind::ColonAssign) {
                let name = self.advance().text;
                self.pos += 1;
                return Some((Some(ty), name));
            }
        }
        self.pos = start;
        None
    }

    /// Type : `float`, `series float`, `array<float>`, `map<string, int>`, `float[]`.
    fn parse_type_ref(&mut self) -> Option<String> {
        let start = self.pos;
        let parsed = self.parse_type_ref_inner();
        if parsed.is_none() {
            self.pos = start;
        }
        parsed
    }

    fn parse_type_ref_inner(&mut self) -> Option<String> {
        if !self.at(TokenKind::Ident) {
            return None;
        }
        let mut text = self.advance().text;
        if matches!(text.as_str(), "series" | "simple" | "const") && self.at(TokenKind::Ident) {
            text.push(' ');
            text.push_str(&self.advance().text);
        }
        if self.eat(TokenKind::Lt) {
            text.push('<');
            loop {
                text.push_str(&self.parse_type_ref_inner()?);
                if self.eat(TokenKind::Comma) {
                    text.push_str(", ");
                    continue;
                }
                if self.eat(TokenKind::Gt) {
                    text.push('>');
                    break;
                }
                return None;
            }
        }
        if self.at(TokenKind::LBracket) && self.kind_at(1) == TokenKind::RBracket {
            self.pos += 2;
            text.push_str("[]");
        }
        Some(text)
    }

    /* ───────────── Expressions ───────────── */

    pub fn parse_expression(&mut self) -> PResult<Expr> {
        self.parse_ternary()
    }

    fn parse_ternary(&mut self) -> PResult<Expr> {
        let condition = self.parse_binary(0)?;
        if !self.eat_continued(TokenKind::Question, false) {
            return Ok(condition);
        }
        let then_expr = self.parse_ternary()?;
        if !self.eat_continued(TokenKind::Colon, false) {
            return Err(self.error_here("':' du ternaire"));
        }
        let else_expr = self.parse_ternary()?;
        Ok(Expr::TernaryExpression {
            condition: Box::new(condition),
            then_expr: Box::new(then_expr),
            else_expr: Box::new(else_expr),
        })
    }

    /// Niveaux binaires, du moins au plus prioritaire.
    fn parse_binary(&mut self, level: usize) -> PResult<Expr> {
        const LEVELS: [&[(TokenKind, BinaryOp)]; 9] = [
            OR_OPS,
            AND_OPS,
            BITOR_OPS,
            BITXOR_OPS,
            BITAND_OPS,
            EQUALITY_OPS,
            COMPARISON_OPS,
            ADDITIVE_OPS,
            MULTIPLICATIVE_OPS,
        ];
        let Some(ops) = LEVELS.get(level) else {
            return self.parse_unary();
        };
        let mut left = self.parse_binary(level + 1)?;
        while let Some(op) = self.match_operator(ops) {
            let right = self.parse_binary(level + 1)?;
            left = Expr::BinaryExpression { op, left: Box::new(left), right: Box::new(right) };
        }
        Ok(left)
    }

    fn match_operator(&mut self, ops: &[(TokenKind, BinaryOp)]) -> Option<BinaryOp> {
        for &(kind, op) in ops {
            if self.eat(kind) {
                return Some(op);
            }
        }
        // `-` en tête de ligne indentée reste un moins unaire
        for &(kind, op) in ops {
            if kind != TokenKind::Minus && self.eat_continued(kind, true) {
                return Some(op);
            }
        }
        None
    }

    fn parse_unary(&mut self) -> PResult<Expr> {
        match self.kind() {
            TokenKind::Keyword(Keyword::Not) | TokenKind::Bang => {
                self.pos += 1;
                let operand = self.parse_unary()?;
                Ok(Expr::UnaryExpression { op: UnaryOp::Not, operand: Box::new(operand) })
            }
            TokenKind::Minus => {
                self.pos += 1;
                let operand = self.parse_unary()?;
                Ok(Expr::UnaryExpression { op: UnaryOp::Neg, operand: Box::new(operand) })
            }
            TokenKind::Plus => {
                self.pos += 1;
                self.parse_unary()
            }
            _ => self.parse_postfix(),
        }
    }

    fn parse_postfix(&mut self) -> PResult<Expr> {
        let mut expr = self.parse_primary()?;
        loop {
            match self.kind() {
                TokenKind::LParen => {
                    self.pos += 1;
                    let arguments = self.parse_arguments()?;
                    expr = Expr::FunctionCall { callee: Box::new(expr), arguments };
                }
                TokenKind::LBracket => {
                    self.pos += 1;
                    let offset = self.parse_expression()?;
                    self.expect(TokenKind::RBracket, "']'")?;
                    expr = Expr::ArrayAccess { target: Box::new(expr), offset: Box::new(offset) };
                }
                TokenKind::Dot => {
                    self.pos += 1;
                    let property = self.expect(TokenKind::Ident, "nom de membre")?.text;
                    expr = Expr::PropertyAccess { object: Box::new(expr), property };
                }
                TokenKind::Lt => match self.generic_annotation_end() {
                    // `array.new<float>(…)` : annotation générique ignorée
                    Some(end) => self.pos = end + 1,
                    None => break,
                },
                _ => break,
            }
        }
        Ok(expr)
    }

    /// Fin d'une annotation `<…>` suivie de `(` ou `.`, sinon `None`.
    fn generic_annotation_end(&self) -> Option<usize> {
        let mut depth = 0usize;
        for (i, tok) in self.tokens.iter().enumerate().skip(self.pos) {
            match tok.kind {
                TokenKind::Lt => depth += 1,
                TokenKind::Gt => {
                    depth -= 1;
                    if depth == 0 {
                        return matches!(self.kind_at_abs(i + 1), TokenKind::LParen | TokenKind::Dot).then_some(i);
                    }
                }
                TokenKind::Ident | TokenKind::Comma | TokenKind::Dot | TokenKind::LBracket | TokenKind::RBracket => {}
                _ => return None,
            }
        }
        None
    }

    /// Arguments après `(` jusqu'à `)` inclus ; `nom = valeur` → argument nommé.
    fn parse_arguments(&mut self) -> PResult<Vec<Argument>> {
        let mut args = Vec::new();
        while !self.eat(TokenKind::RParen) {
            let name = if self.at(TokenKind::Ident) && self.kind_at(1) == TokenKind::Assign {
                let n = self.advance().text;
                self.pos += 1;
                Some(n)
            } else {
                None
            };
            let value = self.parse_expression()?;
            args.push(Argument { name, value });
            if !self.eat(TokenKind::Comma) {
                self.expect(TokenKind::RParen, "')'")?;
                break;
            }
        }
        Ok(args)
    }

    fn parse_primary(&mut self) -> PResult<Expr> {
        let tok = self.peek().clone();
        let literal = |value| Ok(Expr::Literal { value });
        match tok.kind {
            TokenKind::Number => {
                self.pos += 1;
                let n: f64 = tok
                    .text
                    .parse()
                    .map_err(|_| ParseError::new(tok.line, format!("nombre invalide '{}'", tok.text)))?;
                literal(Literal::Number(n))
            }
            TokenKind::Str => {
                self.pos += 1;
                literal(Literal::String(tok.text))
            }
            TokenKind::Color => {
                self.pos += 1;
                literal(Literal::Color(tok.text))
            }
            TokenKind::Keyword(Keyword::True) => {
                self.pos += 1;
                literal(Literal::Bool(true))
            }
            TokenKind::Keyword(Keyword::False) => {
                self.pos += 1;
                literal(Literal::Bool(false))
            }
            TokenKind::Keyword(Keyword::Na) => {
                self.pos += 1;
                literal(Literal::Na)
            }
            TokenKind::Ident => {
                self.pos += 1;
                Ok(Expr::Identifier { name: tok.text })
            }
            TokenKind::LParen => {
                self.pos += 1;
                let inner = self.parse_expression()?;
                self.expect(TokenKind::RParen, "')'")?;
                Ok(inner)
            }
            TokenKind::LBracket => {
                self.pos += 1;
                let mut elements = Vec::new();
                while !self.eat(TokenKind::RBracket) {
                    elements.push(self.parse_expression()?);
                    if !self.eat(TokenKind::Comma) {
                        self.expect(TokenKind::RBracket, "']'")?;
                        break;
                    }
                }
                Ok(Expr::ArrayLiteral { elements })
            }
            TokenKind::LBrace => {
                self.pos += 1;
                let mut properties = Vec::new();
                while !self.eat(TokenKind::RBrace) {
                    let key = match self.kind() {
                        TokenKind::Ident | TokenKind::Str => self.advance().text,
                        _ => return Err(self.error_here("clé d'objet")),
                    };
                    self.expect(TokenKind::Colon, "':'")?;
                    properties.push((key, self.parse_expression()?));
                    if !self.eat(TokenKind::Comma) {
                        self.expect(TokenKind::RBrace, "'}'")?;
                        break;
                    }
                }
                Ok(Expr::ObjectLiteral { properties })
            }
            TokenKind::Keyword(Keyword::Switch) => Ok(Expr::SwitchExpression(self.parse_switch()?)),
            TokenKind::Keyword(Keyword::If) => self.parse_if_expression(),
            _ => Err(self.error_here("expression")),
        }
    }

    /// `if (c) a : b` (ternaire) ou `if c` + blocs (expression conditionnelle).
    fn parse_if_expression(&mut self) -> PResult<Expr> {
        let line = self.line();
        self.expect_keyword(Keyword::If)?;
        let condition = self.parse_expression()?;

        if !self.at(TokenKind::Newline) && !self.at(TokenKind::Indent) {
            let then_expr = self.parse_expression()?;
            self.expect(TokenKind::Colon, "':'")?;
            let else_expr = self.parse_expression()?;
            return Ok(Expr::TernaryExpression {
                condition: Box::new(condition),
                then_expr: Box::new(then_expr),
                else_expr: Box::new(else_expr),
            });
        }

        let then_branch = self.parse_block_body()?;
        let else_branch = self.parse_else(|p| {
            let expression = p.parse_if_expression()?;
            Ok(Stmt::new(line, StmtKind::ExpressionStatement { expression }))
        })?;
        Ok(Expr::IfExpression { condition: Box::new(condition), then_branch, else_branch })
    }

    /* ───────────── Curseur ───────────── */

    fn peek(&self) -> &Token {
        let i = self.pos.min(self.tokens.len() - 1);
        &self.tokens[i]
    }

    fn kind(&self) -> TokenKind {
        self.peek().kind
    }

    fn kind_at(&self, n: usize) -> TokenKind {
        self.kind_at_abs(self.pos + n)
    }

    fn kind_at_abs(&self, i: usize) -> TokenKind {
        self.tokens.get(i).map_or(TokenKind::Eof, |t| t.kind)
    }

    fn line(&self) -> usize {
        self.peek().line
    }

    fn at(&self, kind: TokenKind) -> bool {
        self.kind() == kind
    }

    fn at_keyword(&self, kw: Keyword) -> bool {
        self.kind() == TokenKind::Keyword(kw)
    }

    fn at_statement_end(&self) -> bool {
        matches!(self.kind(), TokenKind::Newline | TokenKind::Dedent | TokenKind::Eof)
    }

    fn eat(&mut self, kind: TokenKind) -> bool {
        if self.at(kind) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    /// Comme `eat`, mais accepte le jeton en tête d'une ligne suivante.
    /// `strict` : exige que la ligne suivante soit plus indentée.
    fn eat_continued(&mut self, kind: TokenKind, strict: bool) -> bool {
        if self.eat(kind) {
            return true;
        }
        if !self.at(TokenKind::Newline) {
            return false;
        }
        let mut i = self.pos;
        let mut net: isize = 0;
        let mut saw_indent = false;
        while self.kind_at_abs(i).is_layout() {
            match self.kind_at_abs(i) {
                TokenKind::Indent => {
                    net += 1;
                    saw_indent = true;
                }
                TokenKind::Dedent => net -= 1,
                _ => {}
            }
            i += 1;
        }
        if self.kind_at_abs(i) != kind || (strict && !saw_indent) {
            return false;
        }
        let absorbed = self.absorbed as isize + net;
        if absorbed < 0 {
            return false;
        }
        self.absorbed = absorbed.unsigned_abs();
        self.pos = i + 1;
        true
    }

    fn advance(&mut self) -> Token {
        let tok = self.peek().clone();
        if tok.kind != TokenKind::Eof {
            self.pos += 1;
        }
        tok
    }

    fn skip_newlines(&mut self) {
        while self.at(TokenKind::Newline) {
            self.pos += 1;
        }
    }

    fn expect(&mut self, kind: TokenKind, what: &str) -> PResult<Token> {
        if self.at(kind) {
            Ok(self.advance())
        } else {
            Err(self.error_here(what))
        }
    }

    fn expect_keyword(&mut self, kw: Keyword) -> PResult<Token> {
        let what = format!("'{}'", format!("{kw:?}").to_ascii_lowercase());
        self.expect(TokenKind::Keyword(kw), &what)
    }

    fn error_here(&self, what: &str) -> ParseError {
        let tok = self.peek();
        ParseError::new(tok.line, format!("{what} attendu, trouvé {}", describe(tok)))
    }
}

/* ───────────────────────── Utilitaires ───────────────────────── */

fn describe(tok: &Token) -> String {
    match tok.kind {
        TokenKind::Eof => "fin de fichier".to_string(),
        TokenKind::Newline => "fin de ligne".to_string(),
        TokenKind::Indent => "indentation".to_string(),
        TokenKind::Dedent => "désindentation".to_string(),
        _ => format!("'{}'", tok.text),
    }
}

/// `input(...)` → `Some(None)`, `input.int(...)` → `Some(Some("int"))`.
fn input_kind(value: &Expr) -> Option<Option<String>> {
    let Expr::FunctionCall { callee, .. } = value else {
        return None;
    };
    let name = callee.dotted_name()?;
    if name == "input" {
        return Some(None);
    }
    name.strip_prefix("input.").map(|k| Some(k.to_string()))
}

fn make_declaration(
    line: usize,
    persistence: Persistence,
    declared_type: Option<String>,
    name: String,
    value: Expr,
) -> Stmt {
    if persistence == Persistence::None {
        if let Some(input_kind) = input_kind(&value) {
            return Stmt::new(
                line,
                StmtKind::InputDeclaration(InputDeclaration { name, input_kind, declared_type, call: value }),
            );
        }
    }
    Stmt::new(line, StmtKind::VariableDeclaration(VariableDeclaration { persistence, declared_type, name, value }))
}

/* ───────────────────────── Tests ───────────────────────── */

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;
    use pretty_assertions::assert_eq;

    fn parse_src(src: &str) -> Program {
        parse(tokenize(src).expect("lexing ok")).expect("parsing ok")
    }

    fn parse_err(src: &str) -> ParseError {
        parse(tokenize(src).expect("lexing ok")).expect_err("doit échouer")
    }

    fn only(src: &str) -> StmtKind {
        let mut p = parse_src(src);
        assert_eq!(p.body.len(), 1, "une seule instruction attendue: {:?}", p.body);
        p.body.remove(0).kind
    }

    #[test]
    fn precedence_multiplicative_over_additive_over_logic() {
        let StmtKind::ExpressionStatement { expression } = only("a or b and c + d * e\n") else {
            panic!("expression attendue");
        };
        let Expr::BinaryExpression { op: BinaryOp::Or, right, .. } = expression else {
            panic!("or en tête");
        };
        let Expr::BinaryExpression { op: BinaryOp::And, right, .. } = *right else {
            panic!("and sous or");
        };
        let Expr::BinaryExpression { op: BinaryOp::Add, right, .. } = *right else {
            panic!("+ sous and");
        };
        assert!(matches!(*right, Expr::BinaryExpression { op: BinaryOp::Mul, .. }));
    }

    #[test]
    fn assignment_versus_expression() {
        assert!(matches!(only("x := close\n"), StmtKind::Assignment(Assignment { op: AssignOp::Reassign, .. })));
        assert!(matches!(only("obj.field += 2\n"), StmtKind::Assignment(Assignment { op: AssignOp::Add, .. })));
        assert!(matches!(only("plot(close)\n"), StmtKind::ExpressionStatement { .. }));
        assert!(matches!(only("a.b := 3\n"), StmtKind::Assignment(_)));
    }

    #[test]
    fn indexed_assignment_target_is_rejected() {
        let e = parse_err("x[1] := 2\n");
        assert!(e.message.contains("cible"));
    }

    #[test]
    fn typed_declaration_with_rollback() {
        match only("float x = 1.5\n") {
            StmtKind::VariableDeclaration(d) => {
                assert_eq!(d.declared_type.as_deref(), Some("float"));
                assert_eq!(d.name, "x");
            }
            other => panic!("déclaration attendue: {other:?}"),
        }
        match only("array<float> xs = array.new<float>(0)\n") {
            StmtKind::VariableDeclaration(d) => assert_eq!(d.declared_type.as_deref(), Some("array<float>")),
            other => panic!("déclaration attendue: {other:?}"),
        }
        // `a < b` n'est pas un type générique : retour arrière vers une expression
        assert!(matches!(only("a < b ? c : d\n"), StmtKind::ExpressionStatement { .. }));
    }

    #[test]
    fn function_declaration_inline_and_block() {
        let p = parse_src("f(x, int n = 2) => x * n\ng(a)\n =>\n    b = a + 1\n    b * 2\n");
        let StmtKind::FunctionDeclaration(f) = &p.body[0].kind else { panic!("fonction f") };
        assert_eq!(f.name, "f");
        assert_eq!(f.params.len(), 2);
        assert_eq!(f.params[1].declared_type.as_deref(), Some("int"));
        assert!(f.params[1].default.is_some());
        assert_eq!(f.body.len(), 1);
        let StmtKind::FunctionDeclaration(g) = &p.body[1].kind else { panic!("fonction g") };
        assert_eq!(g.body.len(), 2);
        assert_eq!(p.body.len(), 2);
    }

    #[test]
    fn destructuring_versus_array_literal() {
        assert!(matches!(only("[m, s, h] = ta.macd(close, 12, 26, 9)\n"), StmtKind::DestructuringAssignment { .. }));
        assert!(matches!(only("[1, 2]\n"), StmtKind::ExpressionStatement { .. }));
    }

    #[test]
    fn var_chain_becomes_multi_declaration() {
        let StmtKind::MultiDeclaration { declarations } = only("var a = 0, varip float b = 1, c = 2, plot(a)\n") else {
            panic!("multi attendu");
        };
        assert_eq!(declarations.len(), 4);
        let persist: Vec<_> = declarations
            .iter()
            .filter_map(|d| match &d.kind {
                StmtKind::VariableDeclaration(v) => Some(v.persistence),
                _ => None,
            })
            .collect();
        assert_eq!(persist, vec![Persistence::Var, Persistence::Varip, Persistence::Var]);
        assert!(matches!(declarations[3].kind, StmtKind::ExpressionStatement { .. }));
    }

    #[test]
    fn comma_chains() {
        assert!(matches!(only("a := 1, b := 2\n"), StmtKind::Block { .. }));
        assert!(matches!(
            only("plot(a), plot(b)\n"),
            StmtKind::ExpressionStatement { expression: Expr::SequenceExpression { .. } }
        ));
        assert!(matches!(only("label h = na, label.delete(h[1])\n"), StmtKind::MultiDeclaration { .. }));
    }

    #[test]
    fn if_else_if_chain() {
        let src = "if a\n    x := 1\nelse if b\n    x := 2\nelse\n    x := 3\n";
        let StmtKind::IfStatement(s) = only(src) else { panic!("if attendu") };
        let else_branch = s.else_branch.expect("else");
        let StmtKind::IfStatement(inner) = &else_branch[0].kind else { panic!("else if") };
        assert!(inner.else_branch.is_some());
    }

    #[test]
    fn for_loops() {
        let StmtKind::ForStatement(f) = only("for i = 0 to 10 by 2\n    s += i\n") else { panic!("for") };
        assert_eq!(f.variable, "i");
        assert!(f.step.is_some());
        let StmtKind::ForInStatement(f) = only("for [i, v] in xs\n    s += v\n") else { panic!("for in") };
        assert_eq!(f.bindings, vec!["i".to_string(), "v".to_string()]);
        let StmtKind::ForInStatement(f) = only("for v in xs\n    s += v\n") else { panic!("for in") };
        assert_eq!(f.bindings, vec!["v".to_string()]);
    }

    #[test]
    fn switch_forms() {
        let src = "x = switch m\n    \"a\" => 1\n    \"b\" =>\n        y = 2\n        y\n    => 3\n";
        let StmtKind::Assignment(a) = only(src) else { panic!("affectation") };
        let Expr::SwitchExpression(sw) = a.value else { panic!("switch") };
        assert!(sw.subject.is_some());
        assert_eq!(sw.arms.len(), 3);
        assert_eq!(sw.arms[1].body.len(), 2);
        assert!(sw.arms[2].pattern.is_none());

        let StmtKind::SwitchStatement(sw) = only("switch\n    a > b => plot(a)\n    => plot(b)\n") else {
            panic!("switch instruction");
        };
        assert!(sw.subject.is_none());
        assert_eq!(sw.arms.len(), 2);
        assert!(sw.arms[0].pattern.is_some());
        assert!(sw.arms[1].pattern.is_none());
        assert!(matches!(sw.arms[1].body[0].kind, StmtKind::ExpressionStatement { .. }));
    }

    #[test]
    fn inline_arm_calls_are_not_functions() {
        let StmtKind::Assignment(a) = only("x = switch m\n    1 => nz(y)\n    => f(1)\n") else {
            panic!("affectation")
        };
        let Expr::SwitchExpression(sw) = a.value else { panic!("switch") };
        assert_eq!(sw.arms.len(), 2);
        assert!(sw.arms.iter().all(|arm| matches!(arm.body[0].kind, StmtKind::ExpressionStatement { .. })));

        let StmtKind::SwitchStatement(sw) = only("switch m\n    1 => plot(1)\n    => plot(0)\n") else {
            panic!("switch instruction");
        };
        assert_eq!(sw.arms.len(), 2);
    }

    #[test]
    fn arrow_on_an_indented_next_line_still_declares() {
        let StmtKind::FunctionDeclaration(f) = only("f(a)\n    => a + 1\n") else { panic!("fonction") };
        assert_eq!(f.name, "f");
        assert_eq!(f.params.len(), 1);
    }

    #[test]
    fn wildcard_must_be_last() {
        let e = parse_err("x = switch m\n    => 0\n    1 => 1\n");
        assert_eq!(e.line, 2);
        assert!(e.message.contains("joker"));
    }

    #[test]
    fn study_input_type_import() {
        let p = parse_src(
            "//@version=5\nindicator(\"Mon indic\", overlay = true)\nimport TradingView/ta/7 as tav\nlength = input.int(14, \"Période\")\ntype Pivot\n    float price = 0\n    int idx\n",
        );
        assert_eq!(p.version, Some(5));
        let StmtKind::StudyDeclaration(s) = &p.body[0].kind else { panic!("study") };
        assert_eq!(s.kind, StudyKind::Indicator);
        assert_eq!(s.title.as_deref(), Some("Mon indic"));
        let StmtKind::ImportDeclaration { path, alias } = &p.body[1].kind else { panic!("import") };
        assert_eq!(path, "TradingView/ta/7");
        assert_eq!(alias.as_deref(), Some("tav"));
        let StmtKind::InputDeclaration(i) = &p.body[2].kind else { panic!("input") };
        assert_eq!(i.name, "length");
        assert_eq!(i.input_kind.as_deref(), Some("int"));
        let StmtKind::TypeDeclaration(t) = &p.body[3].kind else { panic!("type") };
        assert_eq!(t.fields.len(), 2);
        assert!(t.fields[0].default.is_some());
    }

    #[test]
    fn leading_ternary_lines_continue_expression() {
        let p = parse_src("if c\n    x = a > b\n      ? a\n      : b\n    y = 1\nz = 2\n");
        let StmtKind::IfStatement(s) = &p.body[0].kind else { panic!("if") };
        assert_eq!(s.then_branch.len(), 2);
        let StmtKind::Assignment(a) = &s.then_branch[0].kind else { panic!("affectation") };
        assert!(matches!(a.value, Expr::TernaryExpression { .. }));
        assert_eq!(p.body.len(), 2);
    }

    #[test]
    fn if_expression_forms() {
        let StmtKind::Assignment(a) = only("x = if (c) 1 : 2\n") else { panic!("affectation") };
        assert!(matches!(a.value, Expr::TernaryExpression { .. }));
        let StmtKind::Assignment(a) = only("x = if c\n    1\nelse\n    2\n") else { panic!("affectation") };
        assert!(matches!(a.value, Expr::IfExpression { else_branch: Some(_), .. }));
    }

    #[test]
    fn named_arguments_and_generics() {
        let StmtKind::ExpressionStatement { expression } = only("plot(close, title = \"c\", color = color.red)\n") else {
            panic!("expression");
        };
        let Expr::FunctionCall { arguments, .. } = expression else { panic!("appel") };
        let names: Vec<_> = arguments.iter().map(|a| a.name.clone()).collect();
        assert_eq!(names, vec![None, Some("title".to_string()), Some("color".to_string())]);
    }

    #[test]
    fn error_reports_human_line() {
        let e = parse_err("a = 1\nb = (2 + 3]\nc = 4\n");
        assert_eq!(e.line, 2);
        assert!(e.message.contains("')'"), "{}", e.message);
    }
}
