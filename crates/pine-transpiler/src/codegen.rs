//! codegen.rs — AST → module JavaScript (ES module)
//!
//! Disposition du module émis :
//!   en-tête → prélude runtime → `propagateNa` → façades d'espaces de noms
//!   → fabriques de types → imports → métadonnées d'étude → entrées hoistées
//!   → `function main(bars, state) { … }` → `export { main, <entrées> };`
//!
//! Classification d'un identifiant (portée la plus interne d'abord) :
//! - persistant (`var`/`varip`) → `state.x` ;
//! - local déclaré → `x` ;
//! - espace de noms réservé → `pinescript.x` ;
//! - sinon local implicite (`let x = …` à la première affectation).
//!
//! Une affectation implicite dans un bloc imbriqué est déclarée en tête de la
//! fonction englobante (`let x;`) pour rester lisible après le bloc.
//! Seuls des conteneurs ordonnés pilotent l'émission : sortie déterministe.

use std::collections::{HashMap, HashSet};

use tracing::warn;

use crate::ast::{
    Argument, AssignOp, Assignment, Expr, ForInStatement, ForStatement, FunctionDeclaration, IfStatement,
    InputDeclaration, Literal, Persistence, Program, Stmt, StmtKind, StudyDeclaration, StudyKind, Switch,
    TypeDeclaration, UnaryOp, VariableDeclaration,
};
use crate::builtins::{self, RUNTIME_ROOT};
use crate::config::CompilerConfig;
use crate::diagnostics::{Diagnostic, GenerateError};

type GResult<T> = Result<T, GenerateError>;

/// Séries de barres exposées comme locales de `main`.
const BAR_SERIES: &[&str] = &["open", "high", "low", "close", "volume", "time"];

/// Mots réservés JS : un identifiant du script portant ce nom est suffixé `_`.
const JS_RESERVED: &[&str] = &[
    "arguments", "await", "case", "catch", "class", "const", "debugger", "default", "delete", "do", "enum",
    "eval", "export", "extends", "finally", "function", "implements", "in", "instanceof", "interface", "let",
    "new", "null", "package", "private", "protected", "public", "static", "super", "this", "throw", "try",
    "typeof", "void", "with", "yield",
];

/// Noms pris par le module émis (`main(bars, state)`, racine runtime).
const MODULE_NAMES: &[&str] = &["bars", "main", RUNTIME_ROOT, "state"];

/// Code JS produit + avertissements non bloquants.
#[derive(Debug, Clone, PartialEq)]
pub struct Generated {
    pub code: String,
    pub warnings: Vec<Diagnostic>,
}

/// Génère le module JS d'un programme.
pub fn generate(program: &Program, config: &CompilerConfig) -> GResult<Generated> {
    Generator::new(config).run(program)
}

/* ───────────────────────── Portées ───────────────────────── */

#[derive(Debug, Clone, PartialEq, Eq)]
enum Binding {
    Local,
    /// Persistant : clé sous `state`.
    State(String),
    /// Type ou bibliothèque importée : les appels membres restent tels quels.
    Object,
}

#[derive(Debug, Default)]
struct Scope {
    bindings: HashMap<String, Binding>,
    /// Racine de `main` ou d'une fonction : reçoit les déclarations hoistées.
    function_root: bool,
}

/// Corps de fonction en cours d'émission.
#[derive(Debug)]
struct Frame {
    /// Position d'insertion de `let a, b;` dans le tampon.
    hoist_at: usize,
    depth: usize,
    hoisted: Vec<String>,
    /// `None` pour `main`.
    function: Option<String>,
}

/* ───────────────────────── Générateur ───────────────────────── */

pub struct Generator<'c> {
    config: &'c CompilerConfig,
    out: String,
    depth: usize,
    scopes: Vec<Scope>,
    frames: Vec<Frame>,
    loops: usize,
    temps: usize,
    /// Clés `state.*` déjà attribuées : une par site de déclaration.
    state_keys: HashSet<String>,
    current_line: usize,
    types: Vec<String>,
    imports: Vec<String>,
    study: Vec<String>,
    inputs: Vec<String>,
    warnings: Vec<Diagnostic>,
}

impl<'c> Generator<'c> {
    pub fn new(config: &'c CompilerConfig) -> Self {
        Self {
            config,
            out: String::new(),
            depth: 0,
            scopes: Vec::new(),
            frames: Vec::new(),
            loops: 0,
            temps: 0,
            state_keys: HashSet::new(),
            current_line: 1,
            types: Vec::new(),
            imports: Vec::new(),
            study: Vec::new(),
            inputs: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn run(mut self, program: &Program) -> GResult<Generated> {
        // portée module : entrées, types, imports
        self.scopes.push(Scope::default());

        let mut root = Scope { function_root: true, ..Scope::default() };
        for name in BAR_SERIES.iter().chain(&["hl2", "hlc3", "ohlc4", "bar_index", "last_bar_index"]) {
            root.bindings.insert((*name).to_string(), Binding::Local);
        }
        self.scopes.push(root);

        self.depth = 1;
        self.main_prologue();
        self.frames.push(Frame { hoist_at: self.out.len(), depth: 1, hoisted: Vec::new(), function: None });
        self.emit_statements(&program.body)?;
        self.close_frame();
        self.emit("return globalThis.__pineRuntime;");
        self.depth = 0;

        let body = std::mem::take(&mut self.out);
        let code = self.assemble(program, &body);
        Ok(Generated { code, warnings: self.warnings })
    }

    fn main_prologue(&mut self) {
        self.emit("bars = bars || globalThis;");
        self.emit("state = state || (globalThis.__pineState = globalThis.__pineState || {});");
        self.emit(&format!("{RUNTIME_ROOT}.bindBars(bars);"));
        for name in BAR_SERIES {
            self.emit(&format!("let {name} = {RUNTIME_ROOT}.asSeries(bars.{name});"));
        }
        self.emit(&format!("let hl2 = {RUNTIME_ROOT}.hl2(high, low);"));
        self.emit(&format!("let hlc3 = {RUNTIME_ROOT}.hlc3(high, low, close);"));
        self.emit(&format!("let ohlc4 = {RUNTIME_ROOT}.ohlc4(open, high, low, close);"));
        self.emit("let bar_index = close ? close.length - 1 : 0;");
        self.emit("let last_bar_index = bar_index;");
    }

    fn assemble(&self, program: &Program, body: &str) -> String {
        let mut code = String::new();
        let comments = self.config.comments;

        if comments {
            code.push_str("// Généré par pine2js : ne pas modifier à la main.\n");
            if let Some(v) = program.version {
                code.push_str(&format!("// Script source : version {v}.\n"));
            }
            code.push('\n');
        }

        if self.config.runtime_prelude {
            for line in builtins::prelude_source().lines() {
                if !comments && is_comment_line(line) {
                    continue;
                }
                code.push_str(line);
                code.push('\n');
            }
        } else {
            code.push_str(&format!("const {RUNTIME_ROOT} = globalThis.{RUNTIME_ROOT};\n"));
        }
        code.push('\n');

        let targets = serde_json::Value::from(builtins::propagating_targets());
        code.push_str(&format!("{RUNTIME_ROOT}.propagateNa({targets});\n"));
        for (root, members) in builtins::namespace_aliases() {
            let entries: Vec<String> =
                members.iter().map(|(member, target)| format!("{member}: {RUNTIME_ROOT}.{target}")).collect();
            code.push_str(&format!(
                "{RUNTIME_ROOT}.{root} = Object.assign({RUNTIME_ROOT}.{root} || {{}}, {{ {} }});\n",
                entries.join(", ")
            ));
        }
        code.push('\n');

        for section in [&self.types, &self.imports, &self.study] {
            if section.is_empty() {
                continue;
            }
            for line in section {
                if comments || !is_comment_line(line) {
                    code.push_str(line);
                    code.push('\n');
                }
            }
            code.push('\n');
        }

        if !self.inputs.is_empty() {
            if comments {
                code.push_str("// Entrées\n");
            }
            for name in &self.inputs {
                code.push_str(&format!("let {name};\n"));
            }
            code.push('\n');
        }

        code.push_str("function main(bars, state) {\n");
        code.push_str(body);
        code.push_str("}\n\n");

        let mut exports = vec!["main".to_string()];
        exports.extend(self.inputs.iter().cloned());
        code.push_str(&format!("export {{ {} }};\n", exports.join(", ")));
        code
    }

    /* ───────────── Tampon ───────────── */

    fn indent(&self, depth: usize) -> String {
        " ".repeat(self.config.indent_width * depth)
    }

    fn emit(&mut self, text: &str) {
        let pad = self.indent(self.depth);
        self.out.push_str(&pad);
        self.out.push_str(text);
        self.out.push('\n');
    }

    fn close_frame(&mut self) {
        let Some(frame) = self.frames.pop() else { return };
        if frame.hoisted.is_empty() {
            return;
        }
        let line = format!("{}let {};\n", self.indent(frame.depth), frame.hoisted.join(", "));
        self.out.insert_str(frame.hoist_at, &line);
    }

    fn warn_at(&mut self, message: String) {
        warn!(line = self.current_line, "{message}");
        self.warnings.push(Diagnostic::warning(self.current_line, message));
    }

    /* ───────────── Liaisons ───────────── */

    fn lookup(&self, name: &str) -> Option<&Binding> {
        self.scopes.iter().rev().find_map(|s| s.bindings.get(name))
    }

    fn declare(&mut self, name: &str, binding: Binding) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.bindings.insert(name.to_string(), binding);
        }
    }

    fn declare_module(&mut self, name: &str, binding: Binding) {
        if let Some(scope) = self.scopes.first_mut() {
            scope.bindings.insert(name.to_string(), binding);
        }
    }

    fn declared_here(&self, name: &str) -> bool {
        self.scopes.last().is_some_and(|s| s.bindings.contains_key(name))
    }

    fn at_function_root(&self) -> bool {
        self.scopes.last().is_some_and(|s| s.function_root)
    }

    /// Déclare un local implicite. `true` : l'appelant émet lui-même le `let`
    /// (racine de fonction) ; sinon le nom est hoisté en tête de la fonction.
    fn declare_implicit(&mut self, name: &str) -> bool {
        if self.at_function_root() {
            self.declare(name, Binding::Local);
            return true;
        }
        if let Some(scope) = self.scopes.iter_mut().rev().find(|s| s.function_root) {
            scope.bindings.insert(name.to_string(), Binding::Local);
        }
        if let Some(frame) = self.frames.last_mut() {
            frame.hoisted.push(js_ident(name));
        }
        false
    }

    fn state_key(&mut self, name: &str) -> String {
        let base = match self.frames.last().and_then(|f| f.function.as_deref()) {
            Some(function) => format!("{function}__{name}"),
            None => name.to_string(),
        };
        let mut key = base.clone();
        let mut n = 1;
        while !self.state_keys.insert(key.clone()) {
            n += 1;
            key = format!("{base}__{n}");
        }
        if n > 1 {
            let message = format!("{name}: persistant homonyme, clé `state.{key}`");
            self.warnings.push(Diagnostic::info(self.current_line, message));
        }
        key
    }

    fn resolve_name(&self, name: &str) -> String {
        match self.lookup(name) {
            Some(Binding::State(key)) => format!("state.{key}"),
            Some(_) => js_ident(name),
            None if builtins::is_namespace(name) => format!("{RUNTIME_ROOT}.{name}"),
            None => js_ident(name),
        }
    }

    /* ───────────── Instructions ───────────── */

    fn emit_statements(&mut self, body: &[Stmt]) -> GResult<()> {
        for stmt in body {
            self.emit_stmt(stmt)?;
        }
        Ok(())
    }

    /// Bloc imbriqué : nouvelle portée, un cran d'indentation.
    fn emit_nested(&mut self, body: &[Stmt], locals: &[&str]) -> GResult<()> {
        let mut scope = Scope::default();
        for name in locals {
            scope.bindings.insert((*name).to_string(), Binding::Local);
        }
        self.scopes.push(scope);
        self.depth += 1;
        let result = self.emit_statements(body);
        self.depth -= 1;
        self.scopes.pop();
        result
    }

    fn emit_stmt(&mut self, stmt: &Stmt) -> GResult<()> {
        self.current_line = stmt.line;
        match &stmt.kind {
            StmtKind::StudyDeclaration(s) => self.emit_study(s),
            StmtKind::InputDeclaration(i) => self.emit_input(i),
            StmtKind::VariableDeclaration(d) => self.emit_declaration(d),
            StmtKind::MultiDeclaration { declarations: statements } | StmtKind::Block { statements } => {
                self.emit_statements(statements)
            }
            StmtKind::DestructuringAssignment { targets, value } => self.emit_destructuring(targets, value),
            StmtKind::Assignment(a) => self.emit_assignment(a),
            StmtKind::IfStatement(i) => self.emit_if(i),
            StmtKind::ForStatement(f) => self.emit_for(f),
            StmtKind::ForInStatement(f) => self.emit_for_in(f),
            StmtKind::WhileStatement { condition, body } => {
                let cond = self.expr(condition)?;
                self.emit(&format!("while ({cond}) {{"));
                self.loops += 1;
                let result = self.emit_nested(body, &[]);
                self.loops -= 1;
                result?;
                self.emit("}");
                Ok(())
            }
            StmtKind::SwitchStatement(s) => self.emit_switch(s),
            StmtKind::FunctionDeclaration(f) => self.emit_function(f),
            StmtKind::TypeDeclaration(t) => self.emit_type(t),
            StmtKind::ImportDeclaration { path, alias } => {
                self.emit_import(path, alias.as_deref());
                Ok(())
            }
            StmtKind::ReturnStatement { value } => {
                if !self.frames.iter().any(|f| f.function.is_some()) {
                    return Err(GenerateError::new(stmt.line, "`return` hors d'une fonction"));
                }
                match value {
                    Some(v) => {
                        let v = self.expr(v)?;
                        self.emit(&format!("return {v};"));
                    }
                    None => self.emit("return;"),
                }
                Ok(())
            }
            StmtKind::BreakStatement => self.emit_loop_jump(stmt.line, "break"),
            StmtKind::ContinueStatement => self.emit_loop_jump(stmt.line, "continue"),
            StmtKind::ExpressionStatement { expression } => {
                let e = self.expr(expression)?;
                self.emit(&format!("{e};"));
                Ok(())
            }
        }
    }

    fn emit_loop_jump(&mut self, line: usize, keyword: &str) -> GResult<()> {
        if self.loops == 0 {
            return Err(GenerateError::new(line, format!("`{keyword}` hors d'une boucle")));
        }
        self.emit(&format!("{keyword};"));
        Ok(())
    }

    fn emit_study(&mut self, s: &StudyDeclaration) -> GResult<()> {
        let args = self.arguments(&s.arguments)?;
        let callee = match s.kind {
            StudyKind::Strategy => "strategy",
            StudyKind::Indicator | StudyKind::Study => "indicator",
        };
        if let Some(title) = &s.title {
            self.study.push(format!("// {} : {title}", s.kind.as_str()));
        }
        self.study.push(format!("{RUNTIME_ROOT}.{callee}({args});"));
        Ok(())
    }

    fn emit_input(&mut self, i: &InputDeclaration) -> GResult<()> {
        let call = self.expr(&i.call)?;
        let name = js_ident(&i.name);
        if !self.inputs.contains(&name) {
            self.inputs.push(name.clone());
        }
        self.declare_module(&i.name, Binding::Local);
        self.emit(&format!("{name} = {call};"));
        Ok(())
    }

    fn emit_declaration(&mut self, d: &VariableDeclaration) -> GResult<()> {
        let value = self.expr(&d.value)?;
        match d.persistence {
            Persistence::None if self.declared_here(&d.name) => {
                let target = self.resolve_name(&d.name);
                self.emit(&format!("{target} = {value};"));
            }
            Persistence::None => {
                self.declare(&d.name, Binding::Local);
                self.emit(&format!("let {} = {value};", js_ident(&d.name)));
            }
            Persistence::Var | Persistence::Varip => {
                let key = self.state_key(&d.name);
                self.emit(&format!("if (state.{key} === undefined) state.{key} = {value};"));
                self.declare(&d.name, Binding::State(key));
            }
        }
        Ok(())
    }

    fn emit_assignment(&mut self, a: &Assignment) -> GResult<()> {
        let value = self.expr(&a.value)?;
        let op = match a.op {
            AssignOp::Define | AssignOp::Reassign => "=",
            AssignOp::Add => "+=",
            AssignOp::Sub => "-=",
            AssignOp::Mul => "*=",
            AssignOp::Div => "/=",
        };

        let Expr::Identifier { name } = &a.target else {
            let target = self.expr(&a.target)?;
            self.emit(&format!("{target} {op} {value};"));
            return Ok(());
        };

        if self.lookup(name).is_none() && self.declare_implicit(name) {
            let local = js_ident(name);
            if a.op.is_compound() {
                self.emit(&format!("let {local};"));
                self.emit(&format!("{local} {op} {value};"));
            } else {
                self.emit(&format!("let {local} = {value};"));
            }
            return Ok(());
        }
        let target = self.resolve_name(name);
        self.emit(&format!("{target} {op} {value};"));
        Ok(())
    }

    fn emit_destructuring(&mut self, targets: &[String], value: &Expr) -> GResult<()> {
        if targets.is_empty() {
            return Err(GenerateError::new(self.current_line, "déstructuration sans cible"));
        }
        let value = self.expr(value)?;
        let undeclared: Vec<&String> = targets.iter().filter(|t| self.lookup(t).is_none()).collect();

        if undeclared.len() == targets.len() && self.at_function_root() {
            for t in targets {
                self.declare(t, Binding::Local);
            }
            let names: Vec<String> = targets.iter().map(|t| js_ident(t)).collect();
            self.emit(&format!("let [{}] = {value};", names.join(", ")));
            return Ok(());
        }

        for t in undeclared {
            if self.declare_implicit(t) {
                self.emit(&format!("let {};", js_ident(t)));
            }
        }
        let names: Vec<String> = targets.iter().map(|t| self.resolve_name(t)).collect();
        self.emit(&format!("[{}] = {value};", names.join(", ")));
        Ok(())
    }

    fn emit_if(&mut self, s: &IfStatement) -> GResult<()> {
        let cond = self.expr(&s.condition)?;
        self.emit(&format!("if ({cond}) {{"));
        self.emit_nested(&s.then_branch, &[])?;
        self.emit_else(s.else_branch.as_deref())
    }

    fn emit_else(&mut self, branch: Option<&[Stmt]>) -> GResult<()> {
        match branch {
            None => self.emit("}"),
            Some([Stmt { line, kind: StmtKind::IfStatement(inner) }]) => {
                self.current_line = *line;
                let cond = self.expr(&inner.condition)?;
                self.emit(&format!("}} else if ({cond}) {{"));
                self.emit_nested(&inner.then_branch, &[])?;
                return self.emit_else(inner.else_branch.as_deref());
            }
            Some(body) => {
                self.emit("} else {");
                self.emit_nested(body, &[])?;
                self.emit("}");
            }
        }
        Ok(())
    }

    fn emit_for(&mut self, f: &ForStatement) -> GResult<()> {
        let var = js_ident(&f.variable);
        let start = self.expr(&f.start)?;
        let end = self.expr(&f.end)?;
        let step = match &f.step {
            Some(step) => format!("{var} += {}", group(self.expr(step)?)),
            None => format!("{var}++"),
        };
        self.emit(&format!("for (let {var} = {start}; {var} <= {end}; {step}) {{"));
        self.loops += 1;
        let result = self.emit_nested(&f.body, &[f.variable.as_str()]);
        self.loops -= 1;
        result?;
        self.emit("}");
        Ok(())
    }

    fn emit_for_in(&mut self, f: &ForInStatement) -> GResult<()> {
        let iterable = group(self.expr(&f.iterable)?);
        let names: Vec<String> = f.bindings.iter().map(|b| js_ident(b)).collect();
        let head = match names.as_slice() {
            [single] => format!("for (const {single} of {iterable}) {{"),
            _ => format!("for (const [{}] of {iterable}.entries()) {{", names.join(", ")),
        };
        self.emit(&head);
        let locals: Vec<&str> = f.bindings.iter().map(String::as_str).collect();
        self.loops += 1;
        let result = self.emit_nested(&f.body, &locals);
        self.loops -= 1;
        result?;
        self.emit("}");
        Ok(())
    }

    /// Forme instruction : chaîne `if / else if / else`, bras dans l'ordre source.
    fn emit_switch(&mut self, s: &Switch) -> GResult<()> {
        let subject = match s.subject.as_deref() {
            Some(e @ (Expr::Identifier { .. } | Expr::Literal { .. } | Expr::PropertyAccess { .. })) => {
                Some(self.expr(e)?)
            }
            Some(e) => {
                let v = self.expr(e)?;
                self.temps += 1;
                let temp = format!("__switch{}", self.temps);
                self.emit(&format!("const {temp} = {v};"));
                Some(temp)
            }
            None => None,
        };

        let mut opened = false;
        for arm in &s.arms {
            match &arm.pattern {
                Some(pattern) => {
                    let cond = self.arm_condition(subject.as_deref(), pattern)?;
                    let head = if opened { "} else if" } else { "if" };
                    self.emit(&format!("{head} ({cond}) {{"));
                }
                None if opened => self.emit("} else {"),
                None => self.emit("{"),
            }
            opened = true;
            self.emit_nested(&arm.body, &[])?;
        }
        if opened {
            self.emit("}");
        }
        Ok(())
    }

    fn emit_function(&mut self, f: &FunctionDeclaration) -> GResult<()> {
        self.declare(&f.name, Binding::Local);
        let mut params = Vec::with_capacity(f.params.len());
        for p in &f.params {
            let mut param = js_ident(&p.name);
            if let Some(default) = &p.default {
                param.push_str(" = ");
                param.push_str(&self.expr(default)?);
            }
            params.push(param);
        }
        self.emit(&format!("function {}({}) {{", js_ident(&f.name), params.join(", ")));

        let mut scope = Scope { function_root: true, ..Scope::default() };
        for p in &f.params {
            scope.bindings.insert(p.name.clone(), Binding::Local);
        }
        let saved_loops = std::mem::take(&mut self.loops);
        self.scopes.push(scope);
        self.depth += 1;
        self.frames.push(Frame {
            hoist_at: self.out.len(),
            depth: self.depth,
            hoisted: Vec::new(),
            function: Some(f.name.clone()),
        });
        let result = self.emit_returning(&f.body);
        self.close_frame();
        self.depth -= 1;
        self.scopes.pop();
        self.loops = saved_loops;
        result?;
        self.emit("}");
        Ok(())
    }

    /// Émet un corps dont la dernière instruction fournit la valeur de retour.
    fn emit_returning(&mut self, body: &[Stmt]) -> GResult<()> {
        let Some((last, rest)) = body.split_last() else { return Ok(()) };
        self.emit_statements(rest)?;
        self.current_line = last.line;
        match &last.kind {
            StmtKind::ExpressionStatement { expression } => {
                let e = self.expr(expression)?;
                self.emit(&format!("return {e};"));
            }
            StmtKind::IfStatement(_) | StmtKind::SwitchStatement(_) => {
                let v = self.block_value(std::slice::from_ref(last))?;
                self.emit(&format!("return {v};"));
            }
            StmtKind::Assignment(Assignment { target, .. }) => {
                self.emit_stmt(last)?;
                let t = self.expr(target)?;
                self.emit(&format!("return {t};"));
            }
            StmtKind::VariableDeclaration(d) => {
                self.emit_stmt(last)?;
                let t = self.resolve_name(&d.name);
                self.emit(&format!("return {t};"));
            }
            _ => self.emit_stmt(last)?,
        }
        Ok(())
    }

    fn emit_type(&mut self, t: &TypeDeclaration) -> GResult<()> {
        let mut params = Vec::with_capacity(t.fields.len());
        let mut fields = Vec::with_capacity(t.fields.len());
        for f in &t.fields {
            let local = js_ident(&f.name);
            let param = match &f.default {
                Some(default) => format!("{local} = {}", self.expr(default)?),
                None => local.clone(),
            };
            params.push(param);
            fields.push(format!("{}: {local}", object_key(&f.name)));
        }
        let object = if fields.is_empty() { "{}".to_string() } else { format!("{{ {} }}", fields.join(", ")) };
        self.declare_module(&t.name, Binding::Object);
        self.types.push(format!(
            "const {} = {{ new: function ({}) {{ return {object}; }} }};",
            js_ident(&t.name),
            params.join(", ")
        ));
        Ok(())
    }

    fn emit_import(&mut self, path: &str, alias: Option<&str>) {
        let alias = alias.map_or_else(|| default_alias(path), js_ident);
        self.declare_module(&alias, Binding::Object);
        let path = serde_json::Value::from(path);
        self.imports.push(format!("const {alias} = {RUNTIME_ROOT}.library({path});"));
    }

    /* ───────────── Valeurs de blocs ───────────── */

    /// Valeur d'un bloc en position d'expression (bras de switch, `if` expression).
    fn block_value(&mut self, body: &[Stmt]) -> GResult<String> {
        match body {
            [] => Ok("null".to_string()),
            [Stmt { kind: StmtKind::ExpressionStatement { expression }, .. }] => self.expr(expression),
            [Stmt { line, kind: StmtKind::IfStatement(s) }] => {
                self.current_line = *line;
                self.conditional_value(&s.condition, &s.then_branch, s.else_branch.as_deref())
            }
            [Stmt { kind: StmtKind::SwitchStatement(s), .. }] => self.switch_value(s),
            _ => self.immediate(body),
        }
    }

    fn conditional_value(&mut self, condition: &Expr, then: &[Stmt], otherwise: Option<&[Stmt]>) -> GResult<String> {
        let cond = group(self.expr(condition)?);
        let then = group(self.block_value(then)?);
        let otherwise = match otherwise {
            Some(body) => group(self.block_value(body)?),
            None => "null".to_string(),
        };
        Ok(format!("{cond} ? {then} : {otherwise}"))
    }

    /// Conditionnelle imbriquée construite depuis le dernier bras : le premier
    /// bras source est testé en premier, le joker est le défaut le plus interne.
    ///
    /// Un sujet composé est évalué une seule fois : paramètre d'une fonction
    /// fléchée appliquée au sujet.
    fn switch_value(&mut self, s: &Switch) -> GResult<String> {
        let (subject, hoisted) = match s.subject.as_deref() {
            Some(e @ (Expr::Identifier { .. } | Expr::Literal { .. } | Expr::PropertyAccess { .. })) => {
                (Some(self.expr(e)?), None)
            }
            Some(e) => {
                let v = self.expr(e)?;
                self.temps += 1;
                (Some(format!("__switch{}", self.temps)), Some(v))
            }
            None => (None, None),
        };
        let mut acc = match s.arms.iter().find(|a| a.pattern.is_none()) {
            Some(arm) => self.block_value(&arm.body)?,
            None => "null".to_string(),
        };
        for arm in s.arms.iter().rev() {
            let Some(pattern) = &arm.pattern else { continue };
            let cond = self.arm_condition(subject.as_deref(), pattern)?;
            let value = self.block_value(&arm.body)?;
            acc = format!("{} ? {} : {}", group(cond), group(value), group(acc));
        }
        Ok(match (subject, hoisted) {
            (Some(temp), Some(value)) => format!("(({temp}) => {acc})({value})"),
            _ => acc,
        })
    }

    fn arm_condition(&mut self, subject: Option<&str>, pattern: &Expr) -> GResult<String> {
        let pattern = self.expr(pattern)?;
        Ok(match subject {
            Some(subject) => format!("{} === {}", group(subject.to_string()), group(pattern)),
            None => pattern,
        })
    }

    /// Bloc multi-instructions → fonction fléchée immédiatement invoquée.
    fn immediate(&mut self, body: &[Stmt]) -> GResult<String> {
        let saved_out = std::mem::take(&mut self.out);
        let saved_depth = self.depth;
        let saved_loops = std::mem::take(&mut self.loops);
        self.depth += 1;
        self.scopes.push(Scope::default());
        let result = self.emit_returning(body);
        self.scopes.pop();
        self.depth = saved_depth;
        self.loops = saved_loops;
        let inner = std::mem::replace(&mut self.out, saved_out);
        result?;
        Ok(format!("(() => {{\n{inner}{}}})()", self.indent(self.depth)))
    }

    /* ───────────── Expressions ───────────── */

    fn expr(&mut self, e: &Expr) -> GResult<String> {
        Ok(match e {
            Expr::Literal { value } => literal(value),
            Expr::Identifier { name } => self.resolve_name(name),
            Expr::BinaryExpression { op, left, right } => {
                let l = group(self.expr(left)?);
                let r = group(self.expr(right)?);
                format!("{l} {} {r}", op.js())
            }
            Expr::UnaryExpression { op, operand } => {
                let v = group(self.expr(operand)?);
                match op {
                    UnaryOp::Not => format!("!{v}"),
                    UnaryOp::Neg if v.starts_with('-') => format!("-({v})"),
                    UnaryOp::Neg => format!("-{v}"),
                }
            }
            Expr::TernaryExpression { condition, then_expr, else_expr } => {
                let c = group(self.expr(condition)?);
                let t = group(self.expr(then_expr)?);
                let f = group(self.expr(else_expr)?);
                format!("{c} ? {t} : {f}")
            }
            Expr::IfExpression { condition, then_branch, else_branch } => {
                self.conditional_value(condition, then_branch, else_branch.as_deref())?
            }
            Expr::FunctionCall { callee, arguments } => self.call(callee, arguments)?,
            Expr::ArrayAccess { target, offset } => {
                let target = self.expr(target)?;
                let offset = self.expr(offset)?;
                format!("{RUNTIME_ROOT}.offset({target}, {offset})")
            }
            Expr::PropertyAccess { object, property } => {
                let object = group(self.expr(object)?);
                format!("{object}.{property}")
            }
            Expr::ArrayLiteral { elements } => format!("[{}]", self.list(elements)?),
            Expr::ObjectLiteral { properties } if properties.is_empty() => "{}".to_string(),
            Expr::ObjectLiteral { properties } => {
                let mut entries = Vec::with_capacity(properties.len());
                for (key, value) in properties {
                    entries.push(format!("{}: {}", object_key(key), self.expr(value)?));
                }
                format!("{{ {} }}", entries.join(", "))
            }
            Expr::SwitchExpression(s) => self.switch_value(s)?,
            Expr::SequenceExpression { expressions } => format!("({})", self.list(expressions)?),
        })
    }

    fn list(&mut self, items: &[Expr]) -> GResult<String> {
        let mut parts = Vec::with_capacity(items.len());
        for item in items {
            parts.push(self.expr(item)?);
        }
        Ok(parts.join(", "))
    }

    /// Positionnels d'abord, puis un objet unique `{ nom: valeur, … }` pour les nommés.
    fn arguments(&mut self, args: &[Argument]) -> GResult<String> {
        let mut positional = Vec::with_capacity(args.len());
        let mut named = Vec::new();
        for arg in args {
            let value = self.expr(&arg.value)?;
            match &arg.name {
                Some(name) => named.push(format!("{}: {value}", object_key(name))),
                None => positional.push(value),
            }
        }
        if !named.is_empty() {
            positional.push(format!("{{ {} }}", named.join(", ")));
        }
        Ok(positional.join(", "))
    }

    fn call(&mut self, callee: &Expr, arguments: &[Argument]) -> GResult<String> {
        let Some(name) = callee.dotted_name() else {
            let c = group(self.expr(callee)?);
            let args = self.arguments(arguments)?;
            return Ok(format!("{c}({args})"));
        };
        let root = name.split('.').next().unwrap_or(name.as_str());

        match (self.lookup(root).cloned(), callee) {
            // méthode sur une valeur du script : `a.push(x)`
            (Some(Binding::Local | Binding::State(_)), Expr::PropertyAccess { object, property }) => {
                let receiver = self.expr(object)?;
                let args = self.arguments(arguments)?;
                let mut parts = vec![receiver];
                if !args.is_empty() {
                    parts.push(args);
                }
                if matches!(self.lookup(property), Some(Binding::Local)) {
                    return Ok(format!("{}({})", js_ident(property), parts.join(", ")));
                }
                let method = serde_json::Value::from(property.as_str());
                parts.insert(1, method.to_string());
                Ok(format!("{RUNTIME_ROOT}.invoke({})", parts.join(", ")))
            }
            (Some(_), _) => {
                let c = self.expr(callee)?;
                let args = self.arguments(arguments)?;
                Ok(format!("{c}({args})"))
            }
            (None, _) => {
                let args = self.arguments(arguments)?;
                if let Some(builtin) = builtins::lookup(&name) {
                    if !builtin.accepts(arguments.len()) {
                        self.warn_at(format!(
                            "{name}: {} argument(s), {} attendu(s)",
                            arguments.len(),
                            builtin.arity_hint()
                        ));
                    }
                    return Ok(format!("{}({args})", builtin.runtime_name()));
                }
                if name.contains('.') && builtins::is_namespace(root) {
                    self.warn_at(format!("{name}: builtin inconnue, appel transmis tel quel"));
                }
                let c = self.expr(callee)?;
                Ok(format!("{c}({args})"))
            }
        }
    }
}

/* ───────────────────────── Utilitaires ───────────────────────── */

fn literal(value: &Literal) -> String {
    match value {
        Literal::Number(n) if n.is_finite() => format!("{n}"),
        Literal::Number(_) => "NaN".to_string(),
        Literal::String(s) => serde_json::Value::from(s.as_str()).to_string(),
        Literal::Bool(b) => b.to_string(),
        Literal::Na => "null".to_string(),
        Literal::Color(hex) => format!("{RUNTIME_ROOT}.color.hex({})", serde_json::Value::from(hex.as_str())),
    }
}

fn js_ident(name: &str) -> String {
    if JS_RESERVED.contains(&name) || MODULE_NAMES.contains(&name) {
        format!("{name}_")
    } else {
        name.to_string()
    }
}

fn object_key(key: &str) -> String {
    let mut chars = key.chars();
    let valid = chars.next().is_some_and(|c| c.is_ascii_alphabetic() || c == '_' || c == '$')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$');
    if valid {
        key.to_string()
    } else {
        serde_json::Value::from(key).to_string()
    }
}

/// Alias par défaut d'un import : `user/MaLib/2` → `MaLib`.
fn default_alias(path: &str) -> String {
    let segment = path
        .rsplit('/')
        .find(|s| !s.is_empty() && !s.chars().all(|c| c.is_ascii_digit()))
        .unwrap_or("lib");
    let cleaned: String = segment.chars().map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' }).collect();
    if cleaned.starts_with(|c: char| c.is_ascii_digit()) {
        format!("_{cleaned}")
    } else {
        js_ident(&cleaned)
    }
}

/// Parenthèse une expression composée (espace au niveau 0, hors chaînes).
fn group(expr: String) -> String {
    if is_atomic(&expr) {
        expr
    } else {
        format!("({expr})")
    }
}

fn is_atomic(expr: &str) -> bool {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    for c in expr.chars() {
        if let Some(q) = quote {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                _ if c == q => quote = None,
                _ => {}
            }
            continue;
        }
        match c {
            '"' | '\'' | '`' => quote = Some(c),
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => depth = depth.saturating_sub(1),
            c if c.is_whitespace() && depth == 0 => return false,
            _ => {}
        }
    }
    true
}

fn is_comment_line(line: &str) -> bool {
    let t = line.trim_start();
    t.starts_with("//") || (t.starts_with("/*") && t.ends_with("*/"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;
    use crate::parser::parse;
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    fn bare() -> CompilerConfig {
        CompilerConfig { comments: false, runtime_prelude: false, ..CompilerConfig::default() }
    }

    fn try_js(src: &str) -> GResult<Generated> {
        let tokens = tokenize(src).expect("lex ok");
        let program = parse(tokens).expect("parse ok");
        generate(&program, &bare())
    }

    fn js(src: &str) -> Generated {
        try_js(src).expect("codegen ok")
    }

    #[test]
    fn literals_are_lowered() {
        let out = js("a = \"dit \\\"bonjour\\\"\"\nb = na\nc = #FF0000\nd = 1.5\n").code;
        assert!(out.contains(r#"let a = "dit \"bonjour\"";"#), "{out}");
        assert!(out.contains("let b = null;"));
        assert!(out.contains(r##"let c = pinescript.color.hex("#FF0000");"##));
        assert!(out.contains("let d = 1.5;"));
    }

    #[test]
    fn history_access_goes_through_offset() {
        let out = js("x = close[1]\n").code;
        assert!(out.contains("let x = pinescript.offset(close, 1);"));
        assert!(!out.contains("close[1]"));
    }

    #[test]
    fn persistent_variables_live_in_state() {
        let out = js("var count = 0\ncount := count + 1\n").code;
        assert!(out.contains("if (state.count === undefined) state.count = 0;"));
        assert!(out.contains("state.count = state.count + 1;"));
    }

    #[test]
    fn persistent_variables_in_functions_get_their_own_key() {
        let src = indoc! {"
            tick() =>
                var n = 0
                n += 1
                n
            x = tick()
        "};
        let out = js(src).code;
        assert!(out.contains("if (state.tick__n === undefined) state.tick__n = 0;"), "{out}");
        assert!(out.contains("state.tick__n += 1;"));
        assert!(out.contains("return state.tick__n;"));
        assert!(out.contains("let x = tick();"));
    }

    #[test]
    fn homonymous_persistent_variables_keep_their_own_init() {
        let src = indoc! {"
            if a
                var n = 0
                plot(n)
            if b
                var n = 100
                plot(n)
        "};
        let g = js(src);
        assert!(g.code.contains("if (state.n === undefined) state.n = 0;"), "{}", g.code);
        assert!(g.code.contains("if (state.n__2 === undefined) state.n__2 = 100;"));
        assert!(g.code.contains("pinescript.plot(state.n__2);"));
        assert_eq!(g.warnings.len(), 1);
        assert_eq!(g.warnings[0].severity, crate::diagnostics::Severity::Info);
    }

    #[test]
    fn module_names_are_renamed() {
        let out = js("state = close > open ? 1 : -1\nbars = 3\nmain() => state + bars\nplot(main())\n").code;
        assert!(out.contains("let state_ = (close > open) ? 1 : -1;"), "{out}");
        assert!(out.contains("let bars_ = 3;"));
        assert!(out.contains("function main_() {"));
        assert!(out.contains("return state_ + bars_;"));
        assert!(out.contains("pinescript.plot(main_());"));
        assert!(out.contains("function main(bars, state) {"));
    }

    #[test]
    fn switch_expression_evaluates_a_compound_subject_once() {
        let src = indoc! {"
            x = switch ta.change(close)
                1 => \"haut\"
                -1 => \"bas\"
                => \"plat\"
        "};
        let out = js(src).code;
        assert_eq!(out.matches("pinescript.change(close)").count(), 1, "{out}");
        assert!(out.contains("let x = ((__switch1) => "), "{out}");
        assert!(out.contains(")(pinescript.change(close));"));
    }

    #[test]
    fn switch_expression_tests_first_arm_first() {
        let src = indoc! {"
            x = switch
                a > 1 => 1
                a > 0 => 2
                => 3
        "};
        let out = js(src).code;
        assert!(out.contains("let x = (a > 1) ? 1 : ((a > 0) ? 2 : 3);"), "{out}");
    }

    #[test]
    fn switch_without_wildcard_defaults_to_null() {
        let src = indoc! {"
            y = switch mode
                \"a\" => 1
                \"b\" => 2
        "};
        let out = js(src).code;
        assert!(out.contains(r#"let y = (mode === "a") ? 1 : ((mode === "b") ? 2 : null);"#), "{out}");
    }

    #[test]
    fn switch_statement_becomes_if_chain() {
        let src = indoc! {"
            switch ta.rsi(close, 14) > 70
                true => plot(1)
                => plot(0)
        "};
        let out = js(src).code;
        assert!(out.contains("const __switch1 = pinescript.rsi(close, 14) > 70;"), "{out}");
        assert!(out.contains("if (__switch1 === true) {"));
        assert!(out.contains("} else {"));
    }

    #[test]
    fn named_arguments_trail_as_one_object() {
        let out = js("plot(close, title = \"C\", linewidth = 2)\n").code;
        assert!(out.contains(r#"pinescript.plot(close, { title: "C", linewidth: 2 });"#), "{out}");
    }

    #[test]
    fn inputs_are_hoisted_and_exported() {
        let out = js("length = input.int(14, \"Period\")\nplot(ta.sma(close, length))\n").code;
        assert!(out.contains("let length;\n"));
        assert!(out.contains(r#"length = pinescript.input.int(14, "Period");"#));
        assert!(out.contains("pinescript.plot(pinescript.sma(close, length));"));
        assert!(out.trim_end().ends_with("export { main, length };"));
    }

    #[test]
    fn implicit_locals_in_blocks_are_declared_up_front() {
        let src = indoc! {"
            if close > open
                signal = 1
            else
                signal = -1
            plot(signal)
        "};
        let out = js(src).code;
        let decl = out.find("  let signal;").expect("déclaration hoistée");
        let first = out.find("    signal = 1;").expect("branche then");
        assert!(decl < first);
        assert!(out.contains("    signal = -1;"));
        assert!(!out.contains("let signal = "));
    }

    #[test]
    fn loops_follow_range_and_step() {
        let src = indoc! {"
            total = 0
            for i = 0 to 9 by 2
                total += i
            for [k, v] in values
                total += v
        "};
        let out = js(src).code;
        assert!(out.contains("for (let i = 0; i <= 9; i += 2) {"), "{out}");
        assert!(out.contains("for (const [k, v] of values.entries()) {"));
        assert!(out.contains("total += v;"));
    }

    #[test]
    fn functions_return_their_last_expression() {
        let out = js("double(x) => x * 2\ny = double(close)\n").code;
        assert!(out.contains("function double(x) {"));
        assert!(out.contains("return x * 2;"));
        assert!(out.contains("let y = double(close);"));
    }

    #[test]
    fn methods_on_script_values_dispatch_at_runtime() {
        let out = js("a = array.new_float(0)\na.push(close)\n").code;
        assert!(out.contains("let a = pinescript.arrayNew(0);"));
        assert!(out.contains(r#"pinescript.invoke(a, "push", close);"#), "{out}");
    }

    #[test]
    fn types_become_factories() {
        let src = indoc! {"
            type Point
                float x
                float y = 0
            p = Point.new(1, 2)
        "};
        let out = js(src).code;
        assert!(out.contains("const Point = { new: function (x, y = 0) { return { x: x, y: y }; } };"), "{out}");
        assert!(out.contains("let p = Point.new(1, 2);"));
        assert!(out.find("const Point").expect("type") < out.find("function main").expect("main"));
    }

    #[test]
    fn namespace_values_resolve_to_runtime() {
        let out = js("strategy(\"T\")\nx = strategy.long\nc = color.red\n").code;
        assert!(out.contains(r#"pinescript.strategy("T");"#));
        assert!(out.contains("let x = pinescript.strategy.long;"));
        assert!(out.contains("let c = pinescript.color.red;"));
    }

    #[test]
    fn unknown_and_misused_builtins_only_warn() {
        let g = js("x = ta.frobnicate(close)\ny = ta.sma(close)\n");
        assert!(g.code.contains("let x = pinescript.ta.frobnicate(close);"));
        assert!(g.code.contains("let y = pinescript.sma(close);"));
        assert_eq!(g.warnings.len(), 2);
        assert!(g.warnings[0].message.starts_with("ta.frobnicate"));
        assert_eq!(g.warnings[1].message, "ta.sma: 1 argument(s), 2 attendu(s)");
        assert_eq!(g.warnings[1].line, 2);
    }

    #[test]
    fn misplaced_jumps_are_generation_errors() {
        let e = try_js("x = 1\nbreak\n").expect_err("break hors boucle");
        assert_eq!(e.line, 2);
        assert!(e.message.contains("break"));
        let e = try_js("return 1\n").expect_err("return hors fonction");
        assert!(e.message.contains("return"));
    }

    #[test]
    fn empty_destructuring_is_rejected() {
        let program = Program {
            version: None,
            body: vec![Stmt::new(3, StmtKind::DestructuringAssignment { targets: vec![], value: Expr::ident("x") })],
        };
        let e = generate(&program, &bare()).expect_err("déstructuration vide");
        assert_eq!(e.line, 3);
    }

    #[test]
    fn destructuring_declares_fresh_targets() {
        let out = js("[m, s, h] = ta.macd(close, 12, 26, 9)\n").code;
        assert!(out.contains("let [m, s, h] = pinescript.macd(close, 12, 26, 9);"));
    }

    #[test]
    fn reserved_js_words_are_renamed() {
        let out = js("new = 1\nplot(new)\n").code;
        assert!(out.contains("let new_ = 1;"));
        assert!(out.contains("pinescript.plot(new_);"));
    }

    #[test]
    fn layout_with_prelude_and_comments() {
        let tokens = tokenize("//@version=5\nindicator(\"Demo\")\nplot(close)\n").expect("lex ok");
        let program = parse(tokens).expect("parse ok");
        let code = generate(&program, &CompilerConfig::default()).expect("codegen ok").code;
        assert!(code.starts_with("// Généré par pine2js"));
        assert!(code.contains("// Script source : version 5."));
        let prelude = code.find("const pinescript = {};").expect("prélude");
        let study = code.find("pinescript.indicator(\"Demo\");").expect("étude");
        let main = code.find("function main(bars, state) {").expect("main");
        assert!(prelude < study && study < main);
        assert!(code.contains("pinescript.propagateNa(["));
        assert!(code.contains("pinescript.array = Object.assign(pinescript.array || {}, {"));
    }

    #[test]
    fn comments_can_be_dropped() {
        let tokens = tokenize("indicator(\"Demo\")\n").expect("lex ok");
        let program = parse(tokens).expect("parse ok");
        let cfg = CompilerConfig::default().without_comments();
        let code = generate(&program, &cfg).expect("codegen ok").code;
        assert!(code.lines().all(|l| !l.trim_start().starts_with("//")));
    }

    #[test]
    fn grouping_ignores_spaces_inside_strings_and_calls() {
        assert!(is_atomic("f(a, b)"));
        assert!(is_atomic("\"a b\""));
        assert!(!is_atomic("a + b"));
        assert_eq!(group("a + b".into()), "(a + b)");
        assert_eq!(default_alias("user/MyLib/2"), "MyLib");
    }
}
