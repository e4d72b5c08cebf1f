//! リクエスト行の構文解析
//!
//! ワーカーからの1行は `DebuggerQuery(<tag>,'<Command>(<args...>)')` の
//! 形をとります。タグは応答の相関づけに使う10進整数で、引数は
//! ダブルクォート文字列・整数・True/False・None のいずれかです。

use thiserror::Error;

/// 解析済みのリクエスト
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub tag: u64,
    pub command: String,
    pub args: Vec<Argument>,
}

/// コマンド引数
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Argument {
    Str(String),
    Int(i128),
    Bool(bool),
    None,
}

/// リクエストを実行まで進められなかった理由
///
/// どの変種も応答ストリームの失敗行 `<tag>!<message>` になります。
#[derive(Debug, Error)]
pub enum RequestError {
    #[error("Malformed request: {0}")]
    Malformed(String),
    #[error("Unknown command: {0}")]
    UnknownCommand(String),
    #[error("Invalid arguments for {command}: {reason}")]
    InvalidArguments { command: String, reason: String },
}

/// 1リクエスト行を解析する
pub fn parse_request(line: &str) -> Result<Request, RequestError> {
    let line = line.trim();
    let rest = line
        .strip_prefix("DebuggerQuery(")
        .ok_or_else(|| malformed("missing DebuggerQuery prefix"))?;

    let comma = rest
        .find(',')
        .ok_or_else(|| malformed("missing tag separator"))?;
    let tag: u64 = rest[..comma]
        .trim()
        .parse()
        .map_err(|_| malformed("tag is not an integer"))?;

    let inner = rest[comma + 1..]
        .trim_start()
        .strip_prefix('\'')
        .and_then(|s| s.strip_suffix("')"))
        .ok_or_else(|| malformed("command is not quoted"))?;

    let paren = inner
        .find('(')
        .ok_or_else(|| malformed("missing argument list"))?;
    let command = inner[..paren].trim();
    if command.is_empty() || !command.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(malformed("command is not an identifier"));
    }
    let args_text = inner[paren + 1..]
        .strip_suffix(')')
        .ok_or_else(|| malformed("unterminated argument list"))?;

    Ok(Request {
        tag,
        command: command.to_string(),
        args: parse_args(args_text)?,
    })
}

/// 解析に失敗した行から相関タグだけでも回収する
///
/// 失敗応答にもタグが要るため、先頭の括弧直後にある整数を拾います。
/// それすら読めない行はタグ0として報告します。
pub fn recover_tag(line: &str) -> u64 {
    let line = line.trim();
    line.strip_prefix("DebuggerQuery(")
        .and_then(|rest| {
            let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
            digits.parse().ok()
        })
        .unwrap_or(0)
}

fn malformed(reason: &str) -> RequestError {
    RequestError::Malformed(reason.to_string())
}

fn parse_args(text: &str) -> Result<Vec<Argument>, RequestError> {
    let mut args = Vec::new();
    let bytes = text.as_bytes();
    let mut pos = 0;

    loop {
        while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
            pos += 1;
        }
        if pos >= bytes.len() {
            break;
        }

        if bytes[pos] == b'"' {
            let (value, next) = parse_string(text, pos + 1)?;
            args.push(Argument::Str(value));
            pos = next;
        } else {
            let end = text[pos..]
                .find(',')
                .map(|idx| pos + idx)
                .unwrap_or(text.len());
            let token = text[pos..end].trim();
            args.push(parse_bare_token(token)?);
            pos = end;
        }

        while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
            pos += 1;
        }
        if pos < bytes.len() {
            if bytes[pos] != b',' {
                return Err(malformed("expected comma between arguments"));
            }
            pos += 1;
            // 末尾カンマは引数の欠落
            if text[pos..].trim().is_empty() {
                return Err(malformed("trailing comma in argument list"));
            }
        }
    }

    Ok(args)
}

/// ダブルクォート文字列の本体を読む（開始クォートの次の位置から）
fn parse_string(text: &str, start: usize) -> Result<(String, usize), RequestError> {
    let mut value = String::new();
    let mut chars = text[start..].char_indices();
    while let Some((offset, c)) = chars.next() {
        match c {
            '"' => return Ok((value, start + offset + 1)),
            '\\' => match chars.next() {
                Some((_, escaped @ ('"' | '\\'))) => value.push(escaped),
                Some((_, other)) => {
                    value.push('\\');
                    value.push(other);
                }
                None => return Err(malformed("dangling escape in string")),
            },
            _ => value.push(c),
        }
    }
    Err(malformed("unterminated string"))
}

fn parse_bare_token(token: &str) -> Result<Argument, RequestError> {
    match token {
        "True" => return Ok(Argument::Bool(true)),
        "False" => return Ok(Argument::Bool(false)),
        "None" => return Ok(Argument::None),
        "" => return Err(malformed("empty argument")),
        _ => {}
    }

    let (digits, negative) = match token.strip_prefix('-') {
        Some(rest) => (rest, true),
        None => (token, false),
    };
    let parsed = if let Some(hex) = digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
        i128::from_str_radix(hex, 16)
    } else {
        digits.parse()
    };
    match parsed {
        Ok(value) => Ok(Argument::Int(if negative { -value } else { value })),
        Err(_) => Err(malformed("unrecognized argument token")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_request() {
        let request = parse_request("DebuggerQuery(17,'GetTargetProcess()')").unwrap();
        assert_eq!(request.tag, 17);
        assert_eq!(request.command, "GetTargetProcess");
        assert!(request.args.is_empty());
    }

    #[test]
    fn test_parse_string_arguments() {
        let request =
            parse_request(r#"DebuggerQuery(3,'LookupField("chrome","Browser","tabs_")')"#)
                .unwrap();
        assert_eq!(request.command, "LookupField");
        assert_eq!(
            request.args,
            vec![
                Argument::Str("chrome".to_string()),
                Argument::Str("Browser".to_string()),
                Argument::Str("tabs_".to_string()),
            ]
        );
    }

    #[test]
    fn test_parse_mixed_arguments() {
        let request = parse_request(
            r#"DebuggerQuery(8,'LookupConstants("app", None, -2, True, 0x40)')"#,
        )
        .unwrap();
        assert_eq!(
            request.args,
            vec![
                Argument::Str("app".to_string()),
                Argument::None,
                Argument::Int(-2),
                Argument::Bool(true),
                Argument::Int(0x40),
            ]
        );
    }

    #[test]
    fn test_parse_escaped_string() {
        let request =
            parse_request(r#"DebuggerQuery(1,'ExecuteCommand("print \"x\\y\"")')"#).unwrap();
        assert_eq!(
            request.args,
            vec![Argument::Str(r#"print "x\y""#.to_string())]
        );
    }

    #[test]
    fn test_parse_rejects_malformed_lines() {
        assert!(parse_request("garbage").is_err());
        assert!(parse_request("DebuggerQuery(x,'Foo()')").is_err());
        assert!(parse_request("DebuggerQuery(1,'Foo(')").is_err());
        assert!(parse_request("DebuggerQuery(1,'Foo(1,)')").is_err());
        assert!(parse_request(r#"DebuggerQuery(1,'Foo("unterminated)')"#).is_err());
        assert!(parse_request("DebuggerQuery(1,'Foo(maybe)')").is_err());
    }

    #[test]
    fn test_recover_tag() {
        assert_eq!(recover_tag("DebuggerQuery(42,'Broken"), 42);
        // タグすら読めない行は0へフォールバック
        assert_eq!(recover_tag("complete nonsense"), 0);
        assert_eq!(recover_tag("DebuggerQuery(,'Foo()')"), 0);
    }
}
