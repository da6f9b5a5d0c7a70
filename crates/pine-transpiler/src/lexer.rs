//! lexer.rs — Analyse lexicale des scripts d'indicateurs
//!
//! Particularités du langage source :
//! - indentation significative : la pile des niveaux produit des jetons
//!   `Indent` / `Dedent` explicites (tabulation = 4 colonnes) ;
//! - les lignes vides et les lignes de commentaire ne touchent jamais la pile ;
//! - à l'intérieur de `(`, `[`, `{` les retours à la ligne sont ignorés ;
//! - une ligne qui finit sur un opérateur (binaire, `,`, `.`, `?`, `:`,
//!   affectation…) continue sur la suivante, sans `Newline` ni indentation ;
//! - `;` sépare deux instructions (émet un `Newline`) ;
//! - `//@version=5` est une directive : `version = 5` est tokenisé, les autres
//!   `//@xxx` sont de simples commentaires ;
//! - les tirets Unicode (`–`, `—`, `−`) sont normalisés en `-`.
//!
//! Les mots-clés sont contextuels : voir [`classify`].
//!
//! API :
//!   let tokens = tokenize(src)?;

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms, unused_must_use)]

use crate::diagnostics::LexError;

/* ───────────────────────── Mots-clés ───────────────────────── */

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum Keyword {
    Study,
    Strategy,
    Indicator,
    Version,
    Var,
    Varip,
    If,
    Else,
    For,
    In,
    To,
    By,
    While,
    Switch,
    Type,
    Import,
    As,
    Break,
    Continue,
    Return,
    True,
    False,
    Na,
    And,
    Or,
    Not,
}

impl Keyword {
    /// Table des mots-clés (recherche insensible à la casse).
    pub fn lookup(word: &str) -> Option<Keyword> {
        let kw = match word.to_ascii_lowercase().as_str() {
            "study" => Keyword::Study,
            "strategy" => Keyword::Strategy,
            "indicator" => Keyword::Indicator,
            "version" => Keyword::Version,
            "var" => Keyword::Var,
            "varip" => Keyword::Varip,
            "if" => Keyword::If,
            "else" => Keyword::Else,
            "for" => Keyword::For,
            "in" => Keyword::In,
            "to" => Keyword::To,
            "by" => Keyword::By,
            "while" => Keyword::While,
            "switch" => Keyword::Switch,
            "type" => Keyword::Type,
            "import" => Keyword::Import,
            "as" => Keyword::As,
            "break" => Keyword::Break,
            "continue" => Keyword::Continue,
            "return" => Keyword::Return,
            "true" => Keyword::True,
            "false" => Keyword::False,
            "na" => Keyword::Na,
            "and" => Keyword::And,
            "or" => Keyword::Or,
            "not" => Keyword::Not,
            _ => return None,
        };
        Some(kw)
    }
}

/* ───────────────────────── Tokens ───────────────────────── */

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum TokenKind {
    // Littéraux
    Number,
    Str,
    Color,

    // Ident & mots-clés
    Ident,
    Keyword(Keyword),

    // Arithmétique
    Plus,
    Minus,
    Star,
    Slash,
    Percent,

    // Affectation & combinaisons
    Assign,
    ColonAssign,
    PlusAssign,
    MinusAssign,
    StarAssign,
    SlashAssign,

    // Comparaisons
    EqEq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,

    // Logiques / bit à bit
    AndAnd,
    OrOr,
    Bang,
    Amp,
    Pipe,
    Caret,

    // Ponctuation
    Question,
    Colon,
    Arrow, // =>
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Comma,
    Dot,

    // Structure
    Newline,
    Indent,
    Dedent,
    Eof,
}

impl TokenKind {
    /// Vrai si une ligne terminée par ce jeton continue sur la suivante.
    pub fn continues_line(self) -> bool {
        matches!(
            self,
            TokenKind::Plus
                | TokenKind::Minus
                | TokenKind::Star
                | TokenKind::Slash
                | TokenKind::Percent
                | TokenKind::Assign
                | TokenKind::ColonAssign
                | TokenKind::PlusAssign
                | TokenKind::MinusAssign
                | TokenKind::StarAssign
                | TokenKind::SlashAssign
                | TokenKind::EqEq
                | TokenKind::NotEq
                | TokenKind::Lt
                | TokenKind::Le
                | TokenKind::Gt
                | TokenKind::Ge
                | TokenKind::AndAnd
                | TokenKind::OrOr
                | TokenKind::Bang
                | TokenKind::Amp
                | TokenKind::Pipe
                | TokenKind::Caret
                | TokenKind::Question
                | TokenKind::Colon
                | TokenKind::Comma
                | TokenKind::Dot
                | TokenKind::Keyword(Keyword::And | Keyword::Or | Keyword::Not)
        )
    }

    pub fn is_layout(self) -> bool {
        matches!(self, TokenKind::Newline | TokenKind::Indent | TokenKind::Dedent)
    }
}

/// Jeton : genre + lexème brut + position (ligne 1-based, colonne 0-based).
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub line: usize,
    pub column: usize,
}

/* ───────────────────────── Classification contextuelle ───────────────────────── */

/// Contexte d'un mot au moment de sa classification.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WordContext {
    /// Colonne 0-based du premier caractère du mot.
    pub column: usize,
    /// Le jeton précédent est un `.`.
    pub after_dot: bool,
    /// Le mot suit immédiatement un préfixe de directive `//@`.
    pub after_directive: bool,
    /// Le prochain caractère significatif est `(`.
    pub call_follows: bool,
}

/// Fonction pure et totale : mot-clé ou identifiant selon le contexte.
///
/// - après `.` : toujours un identifiant (`strategy.long`, `x.type`) ;
/// - `na(` : identifiant (fonction `na(x)`), sinon littéral ;
/// - `type` : mot-clé seulement en colonne 0 ;
/// - `version` : mot-clé en colonne 0 ou juste après `//@` ;
/// - `indicator` / `strategy` / `study` : mot-clé seulement en colonne 0 suivi
///   d'un appel, sinon identifiant (`strategy.entry(...)` en début de ligne).
pub fn classify(word: &str, ctx: WordContext) -> TokenKind {
    if ctx.after_dot {
        return TokenKind::Ident;
    }
    let Some(kw) = Keyword::lookup(word) else {
        return TokenKind::Ident;
    };
    let keep = match kw {
        Keyword::Na => !ctx.call_follows,
        Keyword::Type => ctx.column == 0,
        Keyword::Version => ctx.column == 0 || ctx.after_directive,
        Keyword::Indicator | Keyword::Strategy | Keyword::Study => ctx.column == 0 && ctx.call_follows,
        _ => true,
    };
    if keep {
        TokenKind::Keyword(kw)
    } else {
        TokenKind::Ident
    }
}

/* ───────────────────────── Lexer ───────────────────────── */

const TAB_WIDTH: usize = 4;

pub struct Lexer {
    chars: Vec<char>,
    pos: usize,
    line: usize,
    column: usize,
    indent_stack: Vec<usize>,
    group_depth: usize,
    at_line_start: bool,
    after_directive: bool,
    tokens: Vec<Token>,
}

/// Raccourci : tokenise toute la source.
pub fn tokenize(src: &str) -> Result<Vec<Token>, LexError> {
    Lexer::new(src).tokenize()
}

impl Lexer {
    pub fn new(src: &str) -> Self {
        let chars = src
            .chars()
            .map(|c| match c {
                '\u{2013}' | '\u{2014}' | '\u{2212}' => '-',
                c => c,
            })
            .collect();
        Self {
            chars,
            pos: 0,
            line: 1,
            column: 0,
            indent_stack: vec![0],
            group_depth: 0,
            at_line_start: true,
            after_directive: false,
            tokens: Vec::new(),
        }
    }

    pub fn tokenize(mut self) -> Result<Vec<Token>, LexError> {
        loop {
            if self.at_line_start {
                self.at_line_start = false;
                self.line_start()?;
            }
            let Some(c) = self.peek() else { break };
            match c {
                '\n' => self.newline(),
                ' ' | '\t' | '\r' | '\u{a0}' | '\u{feff}' => {
                    self.bump();
                }
                '/' if self.peek_at(1) == Some('/') => self.comment(),
                '"' | '\'' => self.string()?,
                '#' => self.color()?,
                c if c.is_ascii_digit() => self.number(),
                '.' if self.peek_at(1).is_some_and(|d| d.is_ascii_digit()) => self.number(),
                c if is_ident_start(c) => self.word(),
                _ => self.operator()?,
            }
        }

        // Fin de fichier : clôture de la dernière ligne puis des blocs ouverts.
        if self.tokens.last().is_some_and(|t| !t.kind.is_layout()) {
            self.push(TokenKind::Newline, "", self.line, self.column);
        }
        while self.indent_stack.len() > 1 {
            self.indent_stack.pop();
            self.push(TokenKind::Dedent, "", self.line, self.column);
        }
        self.push(TokenKind::Eof, "", self.line, self.column);
        Ok(self.tokens)
    }

    /* ─────────── Lignes & indentation ─────────── */

    fn line_start(&mut self) -> Result<(), LexError> {
        let mut width = 0usize;
        while let Some(c) = self.peek() {
            match c {
                ' ' | '\u{a0}' => width += 1,
                '\t' => width += TAB_WIDTH,
                '\r' => {}
                _ => break,
            }
            self.bump();
        }

        // Ligne vide, fin de fichier ou commentaire : la pile ne bouge pas.
        match self.peek() {
            None | Some('\n') => return Ok(()),
            Some('/') if self.peek_at(1) == Some('/') => return Ok(()),
            _ => {}
        }

        let top = self.current_indent();
        if width > top {
            self.indent_stack.push(width);
            self.push(TokenKind::Indent, "", self.line, self.column);
        } else if width < top {
            while width < self.current_indent() && self.indent_stack.len() > 1 {
                self.indent_stack.pop();
                self.push(TokenKind::Dedent, "", self.line, self.column);
            }
            if width != self.current_indent() {
                return Err(LexError::new(
                    self.line,
                    self.column,
                    format!("indentation incohérente ({width} colonnes ne correspond à aucun bloc ouvert)"),
                ));
            }
        }
        Ok(())
    }

    fn current_indent(&self) -> usize {
        self.indent_stack.last().copied().unwrap_or(0)
    }

    fn newline(&mut self) {
        let (line, column) = (self.line, self.column);
        self.bump();
        self.after_directive = false;

        if self.group_depth > 0 {
            return;
        }
        // Ligne qui se termine par un opérateur : la suivante la prolonge.
        if self.tokens.last().is_some_and(|t| t.kind.continues_line()) {
            return;
        }
        if self.tokens.last().is_some_and(|t| t.kind != TokenKind::Newline) {
            self.push(TokenKind::Newline, "\n", line, column);
        }
        self.at_line_start = true;
    }

    fn comment(&mut self) {
        // `//@version=5` : on saute le préfixe et on laisse `version = 5` se tokeniser.
        if self.peek_at(2) == Some('@') && self.word_at(self.pos + 3) == "version" {
            self.bump();
            self.bump();
            self.bump();
            self.after_directive = true;
            return;
        }
        while let Some(c) = self.peek() {
            if c == '\n' {
                break;
            }
            self.bump();
        }
    }

    /* ─────────── Littéraux ─────────── */

    fn string(&mut self) -> Result<(), LexError> {
        let (line, column) = (self.line, self.column);
        let quote = self.bump().unwrap_or('"');
        let mut value = String::new();
        loop {
            match self.peek() {
                None | Some('\n') => {
                    return Err(LexError::new(line, column, "chaîne non terminée"));
                }
                Some(c) if c == quote => {
                    self.bump();
                    break;
                }
                Some('\\') => {
                    self.bump();
                    match self.bump() {
                        Some('n') => value.push('\n'),
                        Some('t') => value.push('\t'),
                        Some('r') => value.push('\r'),
                        Some(c) => value.push(c),
                        None => return Err(LexError::new(line, column, "chaîne non terminée")),
                    }
                }
                Some(c) => {
                    value.push(c);
                    self.bump();
                }
            }
        }
        self.push(TokenKind::Str, &value, line, column);
        Ok(())
    }

    fn color(&mut self) -> Result<(), LexError> {
        let (line, column) = (self.line, self.column);
        let mut text = String::from('#');
        self.bump();
        while let Some(c) = self.peek() {
            if !c.is_ascii_hexdigit() {
                break;
            }
            text.push(c);
            self.bump();
        }
        match text.len() - 1 {
            6 | 8 => {
                self.push(TokenKind::Color, &text, line, column);
                Ok(())
            }
            0 => Err(LexError::new(line, column, "caractère inattendu: '#'")),
            n => Err(LexError::new(line, column, format!("couleur invalide {text} ({n} chiffres hexadécimaux)"))),
        }
    }

    fn number(&mut self) {
        let (line, column) = (self.line, self.column);
        let mut text = String::new();
        let mut seen_dot = false;
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                text.push(c);
            } else if c == '.' && !seen_dot && !self.peek_at(1).is_some_and(is_ident_start) {
                seen_dot = true;
                text.push(c);
            } else {
                break;
            }
            self.bump();
        }

        // Notation scientifique : 1e-10, 1E6, 1.5e+3
        if matches!(self.peek(), Some('e' | 'E')) {
            let next = self.peek_at(1);
            let digit_after_sign = self.peek_at(2).is_some_and(|c| c.is_ascii_digit());
            let has_exp = next.is_some_and(|c| c.is_ascii_digit()) || (matches!(next, Some('+' | '-')) && digit_after_sign);
            if has_exp {
                text.extend(self.bump());
                if matches!(self.peek(), Some('+' | '-')) {
                    text.extend(self.bump());
                }
                while let Some(c) = self.peek().filter(char::is_ascii_digit) {
                    text.push(c);
                    self.bump();
                }
            }
        }
        self.push(TokenKind::Number, &text, line, column);
    }

    fn word(&mut self) {
        let (line, column) = (self.line, self.column);
        let mut word = String::new();
        while let Some(c) = self.peek().filter(|c| is_ident_continue(*c)) {
            word.push(c);
            self.bump();
        }
        let ctx = WordContext {
            column,
            after_dot: self.tokens.last().is_some_and(|t| t.kind == TokenKind::Dot),
            after_directive: self.after_directive,
            call_follows: self.next_significant() == Some('('),
        };
        self.after_directive = false;
        let kind = classify(&word, ctx);
        self.push(kind, &word, line, column);
    }

    /* ─────────── Opérateurs ─────────── */

    fn operator(&mut self) -> Result<(), LexError> {
        let (line, column) = (self.line, self.column);
        let Some(c) = self.bump() else { return Ok(()) };
        let next = self.peek();

        let (kind, text) = match (c, next) {
            ('+', Some('=')) => (TokenKind::PlusAssign, "+="),
            ('-', Some('=')) => (TokenKind::MinusAssign, "-="),
            ('*', Some('=')) => (TokenKind::StarAssign, "*="),
            ('/', Some('=')) => (TokenKind::SlashAssign, "/="),
            ('=', Some('=')) => (TokenKind::EqEq, "=="),
            ('=', Some('>')) => (TokenKind::Arrow, "=>"),
            (':', Some('=')) => (TokenKind::ColonAssign, ":="),
            ('!', Some('=')) => (TokenKind::NotEq, "!="),
            ('<', Some('=')) => (TokenKind::Le, "<="),
            ('>', Some('=')) => (TokenKind::Ge, ">="),
            ('&', Some('&')) => (TokenKind::AndAnd, "&&"),
            ('|', Some('|')) => (TokenKind::OrOr, "||"),
            _ => {
                let single = match c {
                    '+' => TokenKind::Plus,
                    '-' => TokenKind::Minus,
                    '*' => TokenKind::Star,
                    '/' => TokenKind::Slash,
                    '%' => TokenKind::Percent,
                    '=' => TokenKind::Assign,
                    ':' => TokenKind::Colon,
                    '!' => TokenKind::Bang,
                    '<' => TokenKind::Lt,
                    '>' => TokenKind::Gt,
                    '&' => TokenKind::Amp,
                    '|' => TokenKind::Pipe,
                    '^' => TokenKind::Caret,
                    '?' => TokenKind::Question,
                    ',' => TokenKind::Comma,
                    '.' => TokenKind::Dot,
                    '(' | '[' | '{' => {
                        self.group_depth += 1;
                        match c {
                            '(' => TokenKind::LParen,
                            '[' => TokenKind::LBracket,
                            _ => TokenKind::LBrace,
                        }
                    }
                    ')' | ']' | '}' => {
                        self.group_depth = self.group_depth.saturating_sub(1);
                        match c {
                            ')' => TokenKind::RParen,
                            ']' => TokenKind::RBracket,
                            _ => TokenKind::RBrace,
                        }
                    }
                    ';' => {
                        // Séparateur d'instructions sur une même ligne.
                        if self.group_depth == 0 && self.tokens.last().is_some_and(|t| !t.kind.is_layout()) {
                            self.push(TokenKind::Newline, ";", line, column);
                        }
                        return Ok(());
                    }
                    other => {
                        return Err(LexError::new(line, column, format!("caractère inattendu: {other:?}")));
                    }
                };
                self.push(single, &c.to_string(), line, column);
                return Ok(());
            }
        };
        self.bump();
        self.push(kind, text, line, column);
        Ok(())
    }

    /* ─────────── Curseur ─────────── */

    fn push(&mut self, kind: TokenKind, text: &str, line: usize, column: usize) {
        self.tokens.push(Token { kind, text: text.to_string(), line, column });
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, n: usize) -> Option<char> {
        self.chars.get(self.pos + n).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
            self.column = 0;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    /// Prochain caractère hors espaces/tabulations (sans consommer).
    fn next_significant(&self) -> Option<char> {
        self.chars[self.pos..].iter().copied().find(|c| *c != ' ' && *c != '\t')
    }

    fn word_at(&self, from: usize) -> String {
        self.chars.get(from..).unwrap_or_default().iter().take_while(|c| is_ident_continue(**c)).collect()
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/* ───────────────────────── Tests ───────────────────────── */
