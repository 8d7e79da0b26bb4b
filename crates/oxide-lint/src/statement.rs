//! Raw SQL statements and their shallow structure.
//!
//! Statement sources hand the analyzer plain text. This module splits scripts
//! into statements and derives just enough structure from each one (what is
//! being done, to which table and column) for the rules to match on. It is
//! not a SQL parser: anything outside the handful of DDL shapes the rules care
//! about parses as [`StatementKind::Other`].

use std::fmt;

use crate::error::StatementError;

/// Prefix of comments that carry linter directives.
pub const DIRECTIVE_PREFIX: &str = "oxide-lint:";

/// A lexical token.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    /// Unquoted word: keyword, identifier or number.
    Word(String),
    /// Quoted identifier (`"x"`, `` `x` `` or `[x]`), unescaped.
    Quoted(String),
    /// String literal, including dollar-quoted bodies.
    Literal,
    /// Any other single character.
    Symbol(char),
    /// `-- ...` or `/* ... */` comment text.
    Comment(String),
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Word(w) => f.write_str(w),
            Self::Quoted(q) => write!(f, "\"{q}\""),
            Self::Literal => f.write_str("<literal>"),
            Self::Symbol(c) => write!(f, "{c}"),
            Self::Comment(_) => f.write_str("<comment>"),
        }
    }
}

const fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || !c.is_ascii()
}

/// A lexer over one SQL script.
struct Lexer<'a> {
    /// The input source.
    input: &'a str,
    /// The current byte position.
    pos: usize,
    /// The byte position of the start of the current token.
    start: usize,
}

impl<'a> Lexer<'a> {
    const fn new(input: &'a str) -> Self {
        Self {
            input,
            pos: 0,
            start: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn peek_next(&self) -> Option<char> {
        let mut chars = self.input[self.pos..].chars();
        chars.next();
        chars.next()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.advance();
        }
    }

    /// Returns the next token, or `None` at end of input.
    fn next_token(&mut self) -> Option<Result<Token, StatementError>> {
        self.skip_whitespace();
        self.start = self.pos;
        let c = self.peek()?;

        let token = match c {
            '-' if self.peek_next() == Some('-') => Ok(self.scan_line_comment()),
            '/' if self.peek_next() == Some('*') => self.scan_block_comment(),
            '\'' => self.scan_literal(),
            '"' | '`' => self.scan_quoted(c, c),
            '[' => self.scan_quoted('[', ']'),
            '$' => self.scan_dollar(),
            c if is_word_char(c) => Ok(self.scan_word()),
            _ => {
                self.advance();
                Ok(Token::Symbol(c))
            }
        };
        Some(token)
    }

    fn scan_word(&mut self) -> Token {
        while self.peek().is_some_and(is_word_char) {
            self.advance();
        }
        Token::Word(self.input[self.start..self.pos].to_string())
    }

    fn scan_line_comment(&mut self) -> Token {
        self.advance();
        self.advance();
        let body_start = self.pos;
        while self.peek().is_some_and(|c| c != '\n') {
            self.advance();
        }
        Token::Comment(self.input[body_start..self.pos].trim().to_string())
    }

    fn scan_block_comment(&mut self) -> Result<Token, StatementError> {
        self.advance();
        self.advance();
        let body_start = self.pos;
        loop {
            match self.advance() {
                Some('*') if self.peek() == Some('/') => {
                    let body = self.input[body_start..self.pos - 1].trim().to_string();
                    self.advance();
                    return Ok(Token::Comment(body));
                }
                Some(_) => {}
                None => {
                    return Err(StatementError::Unterminated {
                        what: "block comment",
                        offset: self.start,
                    });
                }
            }
        }
    }

    fn scan_literal(&mut self) -> Result<Token, StatementError> {
        self.advance();
        loop {
            match self.advance() {
                Some('\'') if self.peek() == Some('\'') => {
                    self.advance();
                }
                Some('\'') => return Ok(Token::Literal),
                Some(_) => {}
                None => {
                    return Err(StatementError::Unterminated {
                        what: "string literal",
                        offset: self.start,
                    });
                }
            }
        }
    }

    fn scan_quoted(&mut self, open: char, close: char) -> Result<Token, StatementError> {
        self.advance();
        let mut content = String::new();
        loop {
            match self.advance() {
                // Doubled closing quote is an escaped quote
                Some(c) if c == close && open == close && self.peek() == Some(close) => {
                    self.advance();
                    content.push(c);
                }
                Some(c) if c == close => return Ok(Token::Quoted(content)),
                Some(c) => content.push(c),
                None => {
                    return Err(StatementError::Unterminated {
                        what: "quoted identifier",
                        offset: self.start,
                    });
                }
            }
        }
    }

    /// Scans `$tag$ ... $tag$` bodies; a lone `$` (e.g. `$1`) is a word.
    fn scan_dollar(&mut self) -> Result<Token, StatementError> {
        let rest = &self.input[self.pos + 1..];
        let tag_len = rest
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
            .unwrap_or(rest.len());

        if rest[tag_len..].starts_with('$') {
            let tag = &self.input[self.pos..self.pos + tag_len + 2];
            let body_start = self.pos + tag.len();
            return match self.input[body_start..].find(tag) {
                Some(end) => {
                    self.pos = body_start + end + tag.len();
                    Ok(Token::Literal)
                }
                None => Err(StatementError::Unterminated {
                    what: "dollar-quoted string",
                    offset: self.start,
                }),
            };
        }

        self.advance();
        Ok(self.scan_word())
    }
}

/// Splits a script into statements at top-level semicolons.
///
/// Semicolons inside literals, quoted identifiers and comments do not split.
/// Statements are trimmed and the terminating `;` is dropped. If the script
/// cannot be tokenized past some point, the remainder is one statement.
#[must_use]
pub fn split_statements(script: &str) -> Vec<String> {
    let mut statements = Vec::new();
    let mut lexer = Lexer::new(script);
    let mut statement_start = 0;

    let mut push = |text: &str| {
        let text = text.trim();
        if !text.is_empty() {
            statements.push(text.to_string());
        }
    };

    while let Some(token) = lexer.next_token() {
        match token {
            Ok(Token::Symbol(';')) => {
                push(&script[statement_start..lexer.start]);
                statement_start = lexer.pos;
            }
            Ok(_) => {}
            Err(_) => break,
        }
    }
    push(&script[statement_start..]);

    statements
}

/// A column-level change inside `ALTER TABLE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnChange {
    /// `TYPE ...` / `SET DATA TYPE ...`.
    SetType,
    /// `SET NOT NULL`.
    SetNotNull,
    /// `DROP NOT NULL`.
    DropNotNull,
    /// `SET DEFAULT ...`.
    SetDefault,
    /// `DROP DEFAULT`.
    DropDefault,
    /// A full column redefinition (MySQL `MODIFY` / `CHANGE c c`).
    Redefine {
        /// The new definition contains `NOT NULL`.
        not_null: bool,
        /// The new definition supplies a default.
        has_default: bool,
    },
}

/// One action of an `ALTER TABLE` statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableAction {
    /// `ADD [COLUMN] c ...`.
    AddColumn {
        /// Column name.
        column: String,
        /// The definition contains `NOT NULL`.
        not_null: bool,
        /// The definition supplies a default or an identity generator.
        has_default: bool,
    },
    /// `DROP [COLUMN] c`.
    DropColumn {
        /// Column name.
        column: String,
    },
    /// `RENAME [COLUMN] a TO b` or MySQL `CHANGE a b ...`.
    RenameColumn {
        /// Old column name.
        from: String,
        /// New column name.
        to: String,
    },
    /// `ALTER [COLUMN] c ...`, `MODIFY c ...`, `CHANGE c c ...`.
    AlterColumn {
        /// Column name.
        column: String,
        /// What changes.
        change: ColumnChange,
    },
    /// Constraints, indexes and anything else.
    Other,
}

/// The shape of a statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatementKind {
    /// `CREATE TABLE t`.
    CreateTable {
        /// Table name.
        table: String,
    },
    /// `DROP TABLE t`.
    DropTable {
        /// Table name.
        table: String,
    },
    /// `ALTER TABLE a RENAME TO b` or `RENAME TABLE a TO b`.
    RenameTable {
        /// Old table name.
        from: String,
        /// New table name.
        to: String,
    },
    /// `ALTER TABLE t <actions>`.
    AlterTable {
        /// Table name.
        table: String,
        /// Comma-separated actions, in order.
        actions: Vec<TableAction>,
    },
    /// `CREATE [UNIQUE] INDEX ... ON t`.
    CreateIndex {
        /// Indexed table.
        table: String,
    },
    /// `INSERT INTO t ...`.
    Insert {
        /// Target table.
        table: String,
    },
    /// A statement made only of comments.
    Comment {
        /// Comment text, one line per comment.
        text: String,
    },
    /// Anything else.
    Other,
}

/// A single statement with its derived structure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    /// The raw statement text.
    pub sql: String,
    /// The derived structure.
    pub kind: StatementKind,
    /// Comments found anywhere in the statement.
    pub comments: Vec<String>,
}

impl Statement {
    /// Tokenizes and parses one statement.
    pub fn parse(sql: &str) -> Result<Self, StatementError> {
        let mut lexer = Lexer::new(sql);
        let mut tokens = Vec::new();
        let mut comments = Vec::new();

        while let Some(token) = lexer.next_token() {
            match token? {
                Token::Comment(text) => comments.push(text),
                Token::Symbol(';') => {}
                token => tokens.push(token),
            }
        }

        let kind = if tokens.is_empty() {
            StatementKind::Comment {
                text: comments.join("\n"),
            }
        } else {
            Parser::new(tokens).statement()?
        };

        Ok(Self {
            sql: sql.to_string(),
            kind,
            comments,
        })
    }

    /// Returns true if a comment carries the given linter directive.
    #[must_use]
    pub fn has_directive(&self, directive: &str) -> bool {
        self.comments.iter().any(|comment| {
            comment.find(DIRECTIVE_PREFIX).is_some_and(|at| {
                comment[at + DIRECTIVE_PREFIX.len()..]
                    .trim_start()
                    .starts_with(directive)
            })
        })
    }
}

/// Words that make an added or redefined column self-populating.
const IDENTITY_WORDS: [&str; 7] = [
    "AUTO_INCREMENT",
    "AUTOINCREMENT",
    "GENERATED",
    "IDENTITY",
    "SERIAL",
    "BIGSERIAL",
    "SMALLSERIAL",
];

/// Words after `ADD` that introduce something other than a column.
const ADD_NON_COLUMN: [&str; 8] = [
    "CONSTRAINT",
    "PRIMARY",
    "FOREIGN",
    "UNIQUE",
    "INDEX",
    "KEY",
    "CHECK",
    "FULLTEXT",
];

/// Words after `DROP` that name something other than a column.
const DROP_NON_COLUMN: [&str; 7] = [
    "CONSTRAINT",
    "PRIMARY",
    "FOREIGN",
    "INDEX",
    "KEY",
    "CHECK",
    "DEFAULT",
];

/// Scans a column definition at parenthesis depth zero.
///
/// Returns `(not_null, has_default)`.
fn column_flags(tokens: &[Token]) -> (bool, bool) {
    let mut depth = 0usize;
    let mut not_null = false;
    let mut has_default = false;

    for (i, token) in tokens.iter().enumerate() {
        match token {
            Token::Symbol('(') => depth += 1,
            Token::Symbol(')') => depth = depth.saturating_sub(1),
            Token::Word(word) if depth == 0 => {
                let next_is_null = matches!(
                    tokens.get(i + 1),
                    Some(Token::Word(next)) if next.eq_ignore_ascii_case("NULL")
                );
                if word.eq_ignore_ascii_case("NOT") && next_is_null {
                    not_null = true;
                } else if word.eq_ignore_ascii_case("DEFAULT") {
                    has_default |= tokens.get(i + 1).is_some() && !next_is_null;
                } else if IDENTITY_WORDS.iter().any(|w| word.eq_ignore_ascii_case(w)) {
                    has_default = true;
                }
            }
            _ => {}
        }
    }

    (not_null, has_default)
}

/// Recursive-descent parser over the tokens of one statement.
struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    const fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0 }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn at_keyword(&self, keyword: &str) -> bool {
        matches!(self.peek(), Some(Token::Word(w)) if w.eq_ignore_ascii_case(keyword))
    }

    fn at_any_keyword(&self, keywords: &[&str]) -> bool {
        keywords.iter().any(|k| self.at_keyword(k))
    }

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        if self.at_keyword(keyword) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    /// Consumes the whole keyword sequence, or nothing.
    fn eat_keywords(&mut self, keywords: &[&str]) -> bool {
        let matched = keywords.iter().enumerate().all(|(offset, keyword)| {
            matches!(
                self.tokens.get(self.pos + offset),
                Some(Token::Word(w)) if w.eq_ignore_ascii_case(keyword)
            )
        });
        if matched {
            self.pos += keywords.len();
        }
        matched
    }

    fn expect_keyword(&mut self, keyword: &'static str) -> Result<(), StatementError> {
        if self.eat_keyword(keyword) {
            return Ok(());
        }
        match self.peek() {
            Some(token) => Err(StatementError::Unexpected {
                found: token.to_string(),
                expected: keyword,
            }),
            None => Err(StatementError::UnexpectedEnd(keyword)),
        }
    }

    /// Parses a possibly schema-qualified name and returns its last part.
    fn identifier(&mut self) -> Result<String, StatementError> {
        let mut name = self.name_part()?;
        while self.peek() == Some(&Token::Symbol('.')) {
            self.pos += 1;
            name = self.name_part()?;
        }
        Ok(name)
    }

    fn name_part(&mut self) -> Result<String, StatementError> {
        match self.peek().cloned() {
            Some(Token::Word(name) | Token::Quoted(name)) => {
                self.pos += 1;
                Ok(name)
            }
            Some(token) => Err(StatementError::Unexpected {
                found: token.to_string(),
                expected: "identifier",
            }),
            None => Err(StatementError::UnexpectedEnd("identifier")),
        }
    }

    fn rest(&self) -> &[Token] {
        &self.tokens[self.pos.min(self.tokens.len())..]
    }

    fn statement(&mut self) -> Result<StatementKind, StatementError> {
        if self.eat_keyword("CREATE") {
            self.create()
        } else if self.eat_keyword("DROP") {
            if !self.eat_keyword("TABLE") {
                return Ok(StatementKind::Other);
            }
            self.eat_keywords(&["IF", "EXISTS"]);
            Ok(StatementKind::DropTable {
                table: self.identifier()?,
            })
        } else if self.eat_keyword("RENAME") {
            self.expect_keyword("TABLE")?;
            let from = self.identifier()?;
            self.expect_keyword("TO")?;
            Ok(StatementKind::RenameTable {
                from,
                to: self.identifier()?,
            })
        } else if self.eat_keyword("ALTER") {
            if !self.eat_keyword("TABLE") {
                return Ok(StatementKind::Other);
            }
            self.alter_table()
        } else if self.eat_keywords(&["INSERT", "INTO"]) {
            Ok(StatementKind::Insert {
                table: self.identifier()?,
            })
        } else {
            Ok(StatementKind::Other)
        }
    }

    fn create(&mut self) -> Result<StatementKind, StatementError> {
        self.eat_keyword("UNIQUE");
        if self.eat_keyword("INDEX") {
            while !self.eat_keyword("ON") {
                if self.peek().is_none() {
                    return Err(StatementError::UnexpectedEnd("ON"));
                }
                self.pos += 1;
            }
            self.eat_keyword("ONLY");
            return Ok(StatementKind::CreateIndex {
                table: self.identifier()?,
            });
        }

        let _ = self.eat_keyword("TEMP") || self.eat_keyword("TEMPORARY");
        if !self.eat_keyword("TABLE") {
            return Ok(StatementKind::Other);
        }
        self.eat_keywords(&["IF", "NOT", "EXISTS"]);
        Ok(StatementKind::CreateTable {
            table: self.identifier()?,
        })
    }

    fn alter_table(&mut self) -> Result<StatementKind, StatementError> {
        self.eat_keywords(&["IF", "EXISTS"]);
        self.eat_keyword("ONLY");
        let table = self.identifier()?;

        if self.eat_keywords(&["RENAME", "TO"]) || self.eat_keywords(&["RENAME", "AS"]) {
            return Ok(StatementKind::RenameTable {
                from: table,
                to: self.identifier()?,
            });
        }

        let mut actions = Vec::new();
        for clause in split_top_level(self.rest()) {
            actions.push(Parser::new(clause.to_vec()).table_action()?);
        }
        if actions.is_empty() {
            return Err(StatementError::UnexpectedEnd("ALTER TABLE action"));
        }

        Ok(StatementKind::AlterTable { table, actions })
    }

    fn table_action(&mut self) -> Result<TableAction, StatementError> {
        if self.eat_keyword("ADD") {
            if self.at_any_keyword(&ADD_NON_COLUMN) {
                return Ok(TableAction::Other);
            }
            self.eat_keyword("COLUMN");
            self.eat_keywords(&["IF", "NOT", "EXISTS"]);
            let column = self.identifier()?;
            let (not_null, has_default) = column_flags(self.rest());
            Ok(TableAction::AddColumn {
                column,
                not_null,
                has_default,
            })
        } else if self.eat_keyword("DROP") {
            if self.at_any_keyword(&DROP_NON_COLUMN) {
                return Ok(TableAction::Other);
            }
            self.eat_keyword("COLUMN");
            self.eat_keywords(&["IF", "EXISTS"]);
            Ok(TableAction::DropColumn {
                column: self.identifier()?,
            })
        } else if self.eat_keyword("RENAME") {
            if self.at_any_keyword(&["INDEX", "KEY", "CONSTRAINT"]) {
                return Ok(TableAction::Other);
            }
            self.eat_keyword("COLUMN");
            let from = self.identifier()?;
            self.expect_keyword("TO")?;
            Ok(TableAction::RenameColumn {
                from,
                to: self.identifier()?,
            })
        } else if self.eat_keyword("ALTER") {
            self.eat_keyword("COLUMN");
            let column = self.identifier()?;
            Ok(TableAction::AlterColumn {
                column,
                change: match self.column_change() {
                    Some(change) => change,
                    None => return Ok(TableAction::Other),
                },
            })
        } else if self.eat_keyword("MODIFY") {
            self.eat_keyword("COLUMN");
            let column = self.identifier()?;
            let (not_null, has_default) = column_flags(self.rest());
            Ok(TableAction::AlterColumn {
                column,
                change: ColumnChange::Redefine {
                    not_null,
                    has_default,
                },
            })
        } else if self.eat_keyword("CHANGE") {
            self.eat_keyword("COLUMN");
            let from = self.identifier()?;
            let to = self.identifier()?;
            if from != to {
                return Ok(TableAction::RenameColumn { from, to });
            }
            let (not_null, has_default) = column_flags(self.rest());
            Ok(TableAction::AlterColumn {
                column: from,
                change: ColumnChange::Redefine {
                    not_null,
                    has_default,
                },
            })
        } else {
            Ok(TableAction::Other)
        }
    }

    fn column_change(&mut self) -> Option<ColumnChange> {
        if self.eat_keyword("TYPE") || self.eat_keywords(&["SET", "DATA", "TYPE"]) {
            Some(ColumnChange::SetType)
        } else if self.eat_keywords(&["SET", "NOT", "NULL"]) {
            Some(ColumnChange::SetNotNull)
        } else if self.eat_keywords(&["DROP", "NOT", "NULL"]) {
            Some(ColumnChange::DropNotNull)
        } else if self.eat_keywords(&["SET", "DEFAULT"]) {
            Some(ColumnChange::SetDefault)
        } else if self.eat_keywords(&["DROP", "DEFAULT"]) {
            Some(ColumnChange::DropDefault)
        } else {
            None
        }
    }
}

/// Splits tokens at commas outside parentheses.
fn split_top_level(tokens: &[Token]) -> Vec<&[Token]> {
    let mut clauses = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;

    for (i, token) in tokens.iter().enumerate() {
        match token {
            Token::Symbol('(') => depth += 1,
            Token::Symbol(')') => depth = depth.saturating_sub(1),
            Token::Symbol(',') if depth == 0 => {
                clauses.push(&tokens[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    clauses.push(&tokens[start..]);
    clauses.retain(|clause| !clause.is_empty());
    clauses
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kind(sql: &str) -> StatementKind {
        Statement::parse(sql).unwrap().kind
    }

    fn actions(sql: &str) -> Vec<TableAction> {
        match kind(sql) {
            StatementKind::AlterTable { actions, .. } => actions,
            other => panic!("expected ALTER TABLE, got {other:?}"),
        }
    }

    #[test]
    fn test_split_statements() {
        let script = "CREATE TABLE a (x TEXT DEFAULT ';');\n\
                      -- comment; with semicolon\n\
                      UPDATE \"we;ird\" SET x = 1;;  ";
        assert_eq!(
            split_statements(script),
            vec![
                "CREATE TABLE a (x TEXT DEFAULT ';')",
                "-- comment; with semicolon\nUPDATE \"we;ird\" SET x = 1",
            ]
        );
    }

    #[test]
    fn test_split_dollar_quoted_body() {
        let script = "CREATE FUNCTION f() RETURNS void AS $$ BEGIN PERFORM 1; END $$ LANGUAGE plpgsql; SELECT 1";
        let statements = split_statements(script);
        assert_eq!(statements.len(), 2);
        assert_eq!(statements[1], "SELECT 1");
    }

    #[test]
    fn test_split_unterminated_keeps_remainder() {
        assert_eq!(
            split_statements("SELECT 1; SELECT 'oops; SELECT 2"),
            vec!["SELECT 1", "SELECT 'oops; SELECT 2"]
        );
    }

    #[test]
    fn test_parse_create_and_drop_table() {
        assert_eq!(
            kind("CREATE TABLE IF NOT EXISTS \"public\".\"users\" (id INTEGER)"),
            StatementKind::CreateTable {
                table: "users".to_string()
            }
        );
        assert_eq!(
            kind("drop table `books`"),
            StatementKind::DropTable {
                table: "books".to_string()
            }
        );
        assert_eq!(kind("DROP INDEX \"idx\""), StatementKind::Other);
    }

    #[test]
    fn test_parse_rename_table_forms() {
        let expected = StatementKind::RenameTable {
            from: "a".to_string(),
            to: "b".to_string(),
        };
        assert_eq!(kind("ALTER TABLE \"a\" RENAME TO \"b\""), expected);
        assert_eq!(kind("RENAME TABLE `a` TO `b`"), expected);
        assert_eq!(kind("ALTER TABLE [a] RENAME TO [b]"), expected);
    }

    #[test]
    fn test_parse_add_column_flags() {
        assert_eq!(
            actions("ALTER TABLE \"users\" ADD COLUMN \"age\" integer NOT NULL"),
            vec![TableAction::AddColumn {
                column: "age".to_string(),
                not_null: true,
                has_default: false,
            }]
        );
        assert_eq!(
            actions("ALTER TABLE users ADD age integer DEFAULT 0 NOT NULL"),
            vec![TableAction::AddColumn {
                column: "age".to_string(),
                not_null: true,
                has_default: true,
            }]
        );
        assert_eq!(
            actions("ALTER TABLE users ADD COLUMN note text DEFAULT NULL NOT NULL"),
            vec![TableAction::AddColumn {
                column: "note".to_string(),
                not_null: true,
                has_default: false,
            }]
        );
        assert_eq!(
            actions("ALTER TABLE users ADD COLUMN id bigserial NOT NULL"),
            vec![TableAction::AddColumn {
                column: "id".to_string(),
                not_null: true,
                has_default: true,
            }]
        );
    }

    #[test]
    fn test_parse_not_null_inside_check_is_ignored() {
        assert_eq!(
            actions("ALTER TABLE t ADD COLUMN c integer CHECK (c IS NOT NULL)"),
            vec![TableAction::AddColumn {
                column: "c".to_string(),
                not_null: false,
                has_default: false,
            }]
        );
    }

    #[test]
    fn test_parse_multiple_actions() {
        assert_eq!(
            actions(
                "ALTER TABLE t DROP COLUMN a, ADD CONSTRAINT pk PRIMARY KEY (x, y), \
                 RENAME COLUMN b TO c"
            ),
            vec![
                TableAction::DropColumn {
                    column: "a".to_string()
                },
                TableAction::Other,
                TableAction::RenameColumn {
                    from: "b".to_string(),
                    to: "c".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_parse_alter_column_changes() {
        let change = |sql: &str| match actions(sql).as_slice() {
            [TableAction::AlterColumn { change, .. }] => *change,
            other => panic!("unexpected {other:?}"),
        };

        assert_eq!(
            change("ALTER TABLE t ALTER COLUMN c TYPE bigint USING c::bigint"),
            ColumnChange::SetType
        );
        assert_eq!(
            change("ALTER TABLE t ALTER c SET DATA TYPE text"),
            ColumnChange::SetType
        );
        assert_eq!(
            change("ALTER TABLE t ALTER COLUMN c SET NOT NULL"),
            ColumnChange::SetNotNull
        );
        assert_eq!(
            change("ALTER TABLE t ALTER COLUMN c SET DEFAULT 0"),
            ColumnChange::SetDefault
        );
        assert_eq!(
            change("ALTER TABLE t MODIFY `c` bigint NOT NULL"),
            ColumnChange::Redefine {
                not_null: true,
                has_default: false
            }
        );
    }

    #[test]
    fn test_parse_mysql_change() {
        assert_eq!(
            actions("ALTER TABLE `t` CHANGE `a` `b` varchar(10) NOT NULL"),
            vec![TableAction::RenameColumn {
                from: "a".to_string(),
                to: "b".to_string()
            }]
        );
        assert_eq!(
            actions("ALTER TABLE `t` CHANGE `a` `a` varchar(20)"),
            vec![TableAction::AlterColumn {
                column: "a".to_string(),
                change: ColumnChange::Redefine {
                    not_null: false,
                    has_default: false
                }
            }]
        );
    }

    #[test]
    fn test_parse_index_and_insert() {
        assert_eq!(
            kind("CREATE UNIQUE INDEX \"idx\" ON \"users\" (\"email\")"),
            StatementKind::CreateIndex {
                table: "users".to_string()
            }
        );
        assert_eq!(
            kind("INSERT INTO \"new__users\" (\"id\") SELECT \"id\" FROM \"users\""),
            StatementKind::Insert {
                table: "new__users".to_string()
            }
        );
    }

    #[test]
    fn test_comment_statement_and_directive() {
        let statement = Statement::parse("-- oxide-lint: ignore migration").unwrap();
        assert_eq!(
            statement.kind,
            StatementKind::Comment {
                text: "oxide-lint: ignore migration".to_string()
            }
        );
        assert!(statement.has_directive("ignore"));
        assert!(!statement.has_directive("skip"));

        let inline = Statement::parse("/* oxide-lint:ignore */ UPDATE t SET x = 1").unwrap();
        assert_eq!(inline.kind, StatementKind::Other);
        assert!(inline.has_directive("ignore"));
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(
            Statement::parse("ALTER TABLE \"users").unwrap_err(),
            StatementError::Unterminated {
                what: "quoted identifier",
                offset: 12
            }
        );
        assert_eq!(
            Statement::parse("ALTER TABLE").unwrap_err(),
            StatementError::UnexpectedEnd("identifier")
        );
        assert!(matches!(
            Statement::parse("RENAME TABLE a b"),
            Err(StatementError::Unexpected { expected: "TO", .. })
        ));
    }
}
