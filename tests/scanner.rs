#[cfg(test)]
mod scanner_tests {
    use rox as lox;

    use lox::error::{Diagnostics, LoxError, Result};
    use lox::scanner::*;
    use lox::token::*;

    fn assert_token_sequence(source: &str, expected: &[(TokenType, &str)]) {
        let scanner = Scanner::new(source);
        let tokens: Vec<_> = scanner.filter_map(|r| r.ok()).collect();

        assert_eq!(tokens.len(), expected.len());

        for (actual, (expected_type, expected_lexeme)) in tokens.iter().zip(expected.iter()) {
            assert_eq!(actual.token_type, *expected_type);
            assert_eq!(actual.lexeme, *expected_lexeme);
        }
    }

    fn assert_token_matches(
        result: &Result<Token>,
        expected_type: TokenType,
        expected_lexeme: &str,
    ) {
        match result {
            Ok(token) => {
                assert_eq!(
                    token.token_type, expected_type,
                    "Expected token type {:?}, got {:?}",
                    expected_type, token.token_type
                );
                assert_eq!(
                    token.lexeme, expected_lexeme,
                    "Expected lexeme '{}', got '{}'",
                    expected_lexeme, token.lexeme
                );
            }
            Err(e) => panic!("Expected token but got error: {}", e),
        }
    }

    #[test]
    fn test_scanner_01_symbols() {
        assert_token_sequence(
            "({*.,+*})",
            &[
                (TokenType::LEFT_PAREN, "("),
                (TokenType::LEFT_BRACE, "{"),
                (TokenType::STAR, "*"),
                (TokenType::DOT, "."),
                (TokenType::COMMA, ","),
                (TokenType::PLUS, "+"),
                (TokenType::STAR, "*"),
                (TokenType::RIGHT_BRACE, "}"),
                (TokenType::RIGHT_PAREN, ")"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_scanner_02_maximal_munch() {
        assert_token_sequence(
            "!= ! == = <= < >= > /",
            &[
                (TokenType::BANG_EQUAL, "!="),
                (TokenType::BANG, "!"),
                (TokenType::EQUAL_EQUAL, "=="),
                (TokenType::EQUAL, "="),
                (TokenType::LESS_EQUAL, "<="),
                (TokenType::LESS, "<"),
                (TokenType::GREATER_EQUAL, ">="),
                (TokenType::GREATER, ">"),
                (TokenType::SLASH, "/"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_scanner_03_keywords_and_identifiers() {
        assert_token_sequence(
            "var breaker = nil; while (true) break; fun _f1",
            &[
                (TokenType::VAR, "var"),
                (TokenType::IDENTIFIER, "breaker"),
                (TokenType::EQUAL, "="),
                (TokenType::NIL, "nil"),
                (TokenType::SEMICOLON, ";"),
                (TokenType::WHILE, "while"),
                (TokenType::LEFT_PAREN, "("),
                (TokenType::TRUE, "true"),
                (TokenType::RIGHT_PAREN, ")"),
                (TokenType::BREAK, "break"),
                (TokenType::SEMICOLON, ";"),
                (TokenType::FUN, "fun"),
                (TokenType::IDENTIFIER, "_f1"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_scanner_04_numbers() {
        let tokens: Vec<Token> = Scanner::new("12 3.5 7. .5")
            .filter_map(|r| r.ok())
            .collect();

        let kinds: Vec<&str> = tokens.iter().map(|t| t.token_type.name()).collect();
        assert_eq!(
            kinds,
            vec!["NUMBER", "NUMBER", "NUMBER", "DOT", "DOT", "NUMBER", "EOF"]
        );

        assert_eq!(tokens[0].literal(), Some(Literal::Number(12.0)));
        assert_eq!(tokens[1].literal(), Some(Literal::Number(3.5)));
        assert_eq!(tokens[2].lexeme, "7");
        assert_eq!(tokens[5].lexeme, "5");
    }

    #[test]
    fn test_scanner_05_multiline_string_counts_lines() {
        let tokens: Vec<Token> = Scanner::new("\"one\ntwo\"\nident")
            .filter_map(|r| r.ok())
            .collect();

        assert_eq!(
            tokens[0].token_type,
            TokenType::STRING(String::new()),
            "first token should be a string"
        );
        assert_eq!(tokens[0].literal(), Some(Literal::Str("one\ntwo".into())));
        assert_eq!(tokens[1].lexeme, "ident");
        assert_eq!(tokens[1].line, 3);
    }

    #[test]
    fn test_scanner_06_comments() {
        let source = "a // line comment * / \n/* block\n * still */ b /**/ c";
        let tokens: Vec<Token> = Scanner::new(source).filter_map(|r| r.ok()).collect();

        let lexemes: Vec<&str> = tokens.iter().map(|t| t.lexeme.as_str()).collect();
        assert_eq!(lexemes, vec!["a", "b", "c", ""]);
        assert_eq!(tokens[1].line, 3);
    }

    #[test]
    fn test_scanner_07_block_comment_needs_star_slash_together() {
        // A lone '*' or '/' inside the comment does not end it.
        let tokens: Vec<Token> = Scanner::new("/* a * b / c */ x")
            .filter_map(|r| r.ok())
            .collect();

        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0].lexeme, "x");
    }

    #[test]
    fn test_unexpected_chars_token_sequence() {
        let source = ",.$(#";
        let scanner = Scanner::new(source);

        let results: Vec<_> = scanner.collect();

        // 0: COMMA ','
        // 1: DOT '.'
        // 2: Error for '$'
        // 3: LEFT_PAREN '('
        // 4: Error for '#'
        // 5: EOF
        assert_eq!(results.len(), 6, "Expected 6 items in result");

        assert_token_matches(&results[0], TokenType::COMMA, ",");
        assert_token_matches(&results[1], TokenType::DOT, ".");
        assert_token_matches(&results[3], TokenType::LEFT_PAREN, "(");
        assert_token_matches(&results[5], TokenType::EOF, "");

        let error_count = results.iter().filter(|r| r.is_err()).count();
        assert_eq!(error_count, 2, "Expected 2 error messages");

        for err in results.iter().filter_map(|r| r.as_ref().err()) {
            let text = err.to_string();
            assert!(
                text.contains("Unexpected character"),
                "Error message should contain 'Unexpected character', got: {}",
                text
            );
        }
    }

    #[test]
    fn test_non_ascii_outside_string_is_one_error() {
        let results: Vec<_> = Scanner::new("é\"ü\"").collect();

        assert_eq!(results.len(), 3);
        assert_eq!(
            results[0].as_ref().err().map(|e| e.to_string()),
            Some("[line 1] Error: Unexpected character: é".to_string())
        );
        assert_token_matches(&results[1], TokenType::STRING(String::new()), "\"ü\"");
    }

    #[test]
    fn test_unterminated_string_is_reported_and_scanning_finishes() {
        let mut diagnostics = Diagnostics::new();
        let tokens = scan_tokens("var a = \"oops\n;", &mut diagnostics);

        assert_eq!(diagnostics.len(), 1);
        assert!(matches!(
            diagnostics.iter().next(),
            Some(LoxError::Lex { line: 2, .. })
        ));
        assert_eq!(tokens.last().map(|t| t.token_type.clone()), Some(TokenType::EOF));
        assert_eq!(tokens.len(), 4);
    }

    #[test]
    fn test_unterminated_block_comment() {
        let mut diagnostics = Diagnostics::new();
        let tokens = scan_tokens("a /* never\nclosed", &mut diagnostics);

        assert_eq!(tokens.len(), 2);
        assert_eq!(
            diagnostics.to_string(),
            "[line 2] Error: Unterminated block comment."
        );
    }

    #[test]
    fn test_token_display() {
        let tokens: Vec<Token> = Scanner::new("42 \"hi\" 1.5 and")
            .filter_map(|r| r.ok())
            .collect();

        let lines: Vec<String> = tokens.iter().map(|t| t.to_string()).collect();
        assert_eq!(
            lines,
            vec![
                "NUMBER 42 42.0",
                "STRING \"hi\" hi",
                "NUMBER 1.5 1.5",
                "AND and null",
                "EOF  null",
            ]
        );
    }

    #[test]
    fn test_token_serializes_to_json() {
        let token = Scanner::new("foo").next().unwrap().unwrap();
        let json = serde_json::to_value(&token).unwrap();

        assert_eq!(json["lexeme"], "foo");
        assert_eq!(json["line"], 1);
        assert_eq!(json["token_type"], "IDENTIFIER");
    }
}
