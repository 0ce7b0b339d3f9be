#[cfg(test)]
mod scanner_tests {
    use rox::error::{Diagnostics, LoxError};
    use rox::scanner::*;
    use rox::token::*;

    fn assert_token_sequence(source: &str, expected: &[(TokenType, &str)]) {
        let scanner = Scanner::new(source);
        let tokens: Vec<_> = scanner.filter_map(Result::ok).collect();

        assert_eq!(tokens.len(), expected.len());

        for (actual, (expected_type, expected_lexeme)) in tokens.iter().zip(expected.iter()) {
            assert_eq!(actual.token_type, *expected_type);
            assert_eq!(actual.lexeme, *expected_lexeme);
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
    fn test_scanner_02_operators() {
        assert_token_sequence(
            "! != = == < <= > >= / ? :",
            &[
                (TokenType::BANG, "!"),
                (TokenType::BANG_EQUAL, "!="),
                (TokenType::EQUAL, "="),
                (TokenType::EQUAL_EQUAL, "=="),
                (TokenType::LESS, "<"),
                (TokenType::LESS_EQUAL, "<="),
                (TokenType::GREATER, ">"),
                (TokenType::GREATER_EQUAL, ">="),
                (TokenType::SLASH, "/"),
                (TokenType::QUESTION, "?"),
                (TokenType::COLON, ":"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_scanner_03_keywords_and_identifiers() {
        assert_token_sequence(
            "var breaker = fun; break while_ orchid or",
            &[
                (TokenType::VAR, "var"),
                (TokenType::IDENTIFIER, "breaker"),
                (TokenType::EQUAL, "="),
                (TokenType::FUN, "fun"),
                (TokenType::SEMICOLON, ";"),
                (TokenType::BREAK, "break"),
                (TokenType::IDENTIFIER, "while_"),
                (TokenType::IDENTIFIER, "orchid"),
                (TokenType::OR, "or"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_numbers_have_no_leading_dot_or_exponent() {
        let tokens: Vec<Token> = Scanner::new(".5 12.25 7. 1e3")
            .filter_map(Result::ok)
            .collect();

        let kinds: Vec<&str> = tokens.iter().map(|t| t.token_type.name()).collect();
        assert_eq!(
            kinds,
            vec!["DOT", "NUMBER", "NUMBER", "NUMBER", "DOT", "NUMBER", "IDENTIFIER", "EOF"]
        );

        assert_eq!(tokens[1].literal(), Literal::Number(5.0));
        assert_eq!(tokens[2].literal(), Literal::Number(12.25));
        assert_eq!(tokens[3].lexeme, "7");
    }

    #[test]
    fn test_string_escapes_and_line_counting() {
        let tokens: Vec<Token> = Scanner::new("\"a\\tb\\nc\"\n\"two\nlines\" x")
            .filter_map(Result::ok)
            .collect();

        assert_eq!(tokens[0].literal(), Literal::Str("a\tb\nc".to_string()));
        assert_eq!(tokens[0].lexeme, "\"a\\tb\\nc\"");
        assert_eq!(tokens[1].literal(), Literal::Str("two\nlines".to_string()));
        assert_eq!(tokens[1].line, 3);
        assert_eq!(tokens[2].line, 3);
    }

    #[test]
    fn test_nested_block_comments() {
        let source = "1 /* outer /* inner */ still comment */ 2\n// line comment\n3";
        let tokens: Vec<Token> = Scanner::new(source).filter_map(Result::ok).collect();

        let lexemes: Vec<&str> = tokens.iter().map(|t| t.lexeme.as_str()).collect();
        assert_eq!(lexemes, vec!["1", "2", "3", ""]);
        assert_eq!(tokens[2].line, 3);
    }

    #[test]
    fn test_unterminated_comment_and_string_are_reported() {
        let mut diagnostics = Diagnostics::new();
        let tokens = Scanner::new("1 /* never /* closed */").scan_tokens(&mut diagnostics);
        assert_eq!(tokens.len(), 2);
        assert_eq!(
            diagnostics.errors()[0].to_string(),
            "[line 1] Error: Unterminated block comment."
        );

        let mut diagnostics = Diagnostics::new();
        let tokens = Scanner::new("print \"oops").scan_tokens(&mut diagnostics);
        assert_eq!(tokens.last().map(|t| t.token_type.clone()), Some(TokenType::EOF));
        assert!(matches!(diagnostics.errors()[0], LoxError::Lex { .. }));
        assert!(diagnostics.had_error());
    }

    #[test]
    fn test_token_display() {
        let tokens: Vec<Token> = Scanner::new("42 3.5 \"hi\" nil")
            .filter_map(Result::ok)
            .collect();

        let rendered: Vec<String> = tokens.iter().map(|t| t.to_string()).collect();
        assert_eq!(
            rendered,
            vec![
                "NUMBER 42 42.0",
                "NUMBER 3.5 3.5",
                "STRING \"hi\" hi",
                "NIL nil null",
                "EOF  null",
            ]
        );
    }

    #[test]
    fn test_unexpected_chars_token_sequence() {
        let source = ",.$(#";
        let scanner = Scanner::new(source);

        // Collect all results (both tokens and errors)
        let results: Vec<_> = scanner.collect();

        // We expect this sequence:
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

        let errors: Vec<String> = results
            .iter()
            .filter_map(|r| r.as_ref().err())
            .map(|e| e.to_string())
            .collect();

        assert_eq!(
            errors,
            vec![
                "[line 1] Error: Unexpected character: $",
                "[line 1] Error: Unexpected character: #",
            ]
        );

        fn assert_token_matches(
            result: &Result<Token, LoxError>,
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
    }

    #[test]
    fn test_non_ascii_character_is_skipped_whole() {
        let mut diagnostics = Diagnostics::new();
        let tokens = Scanner::new("a é b").scan_tokens(&mut diagnostics);

        let lexemes: Vec<&str> = tokens.iter().map(|t| t.lexeme.as_str()).collect();
        assert_eq!(lexemes, vec!["a", "b", ""]);
        assert_eq!(diagnostics.errors().len(), 1);
    }
}
