use std::collections::VecDeque;
use std::io::{BufRead, Write};

use super::Fault;

/// The `read`/`write` side channel: whitespace-separated integers in, one integer per line out.
pub struct Console {
    input: Box<dyn BufRead>,
    output: Box<dyn Write>,
    pending: VecDeque<String>,
}

impl Console {
    pub fn new(input: impl BufRead + 'static, output: impl Write + 'static) -> Self {
        Console { input: Box::new(input), output: Box::new(output), pending: VecDeque::new() }
    }

    pub fn stdio() -> Self {
        Self::new(std::io::BufReader::new(std::io::stdin()), std::io::stdout())
    }

    /// No input, output discarded.
    pub fn null() -> Self {
        Self::new(std::io::empty(), std::io::sink())
    }

    pub fn read_u64(&mut self) -> Result<u64, Fault> {
        while self.pending.is_empty() {
            let mut line = String::new();
            let n = self.input.read_line(&mut line).map_err(|e| Fault::Io(e.to_string()))?;
            if n == 0 {
                return Err(Fault::InputExhausted);
            }
            self.pending.extend(line.split_whitespace().map(str::to_string));
        }
        let Some(token) = self.pending.pop_front() else {
            return Err(Fault::InputExhausted);
        };
        token
            .parse::<u64>()
            .or_else(|_| token.parse::<i64>().map(|v| v as u64))
            .map_err(|_| Fault::MalformedInput { token })
    }

    pub fn write_u64(&mut self, value: u64) -> Result<(), Fault> {
        writeln!(self.output, "{value}").map_err(|e| Fault::Io(e.to_string()))
    }

    pub fn flush(&mut self) -> Result<(), Fault> {
        self.output.flush().map_err(|e| Fault::Io(e.to_string()))
    }
}

impl std::fmt::Debug for Console {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Console").field("pending", &self.pending).finish_non_exhaustive()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::io::Cursor;
    use std::rc::Rc;

    /// Output sink whose contents the test can inspect after the console is gone.
    #[derive(Clone, Default)]
    pub(crate) struct SharedBuf(pub(crate) Rc<RefCell<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.borrow_mut().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl SharedBuf {
        pub(crate) fn text(&self) -> String {
            String::from_utf8_lossy(&self.0.borrow()).into_owned()
        }
    }

    #[test]
    fn reads_tokens_across_lines() {
        let mut c = Console::new(Cursor::new("1 2\n\n  3\n"), std::io::sink());
        assert_eq!(c.read_u64().unwrap(), 1);
        assert_eq!(c.read_u64().unwrap(), 2);
        assert_eq!(c.read_u64().unwrap(), 3);
        assert_eq!(c.read_u64(), Err(Fault::InputExhausted));
    }

    #[test]
    fn negative_input_wraps() {
        let mut c = Console::new(Cursor::new("-1"), std::io::sink());
        assert_eq!(c.read_u64().unwrap(), u64::MAX);
    }

    #[test]
    fn malformed_input_faults() {
        let mut c = Console::new(Cursor::new("abc"), std::io::sink());
        assert_eq!(c.read_u64(), Err(Fault::MalformedInput { token: "abc".into() }));
    }

    #[test]
    fn writes_one_value_per_line() {
        let out = SharedBuf::default();
        let mut c = Console::new(std::io::empty(), out.clone());
        c.write_u64(42).unwrap();
        c.write_u64(7).unwrap();
        assert_eq!(out.text(), "42\n7\n");
    }
}
