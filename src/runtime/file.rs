//! File handles returned by the `open` built-in, with `read`/`write`/`close`
//! methods. Reads are line-oriented; EOF is reported as `null`.

use std::cell::RefCell;
use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, Write};
use std::rc::Rc;

use crate::runtime::environment::Env;
use crate::runtime::value::{expect_method_arity, methods_value, Value};
use crate::token::Token;

const METHODS: &[&str] = &["close", "methods", "read", "write"];

#[derive(Debug)]
pub struct FileHandle {
    path: String,
    reader: Option<BufReader<File>>,
    writer: Option<File>,
}

impl FileHandle {
    /// Modes: `r` read, `w` create/truncate, `a` append (creating).
    pub fn open(path: &str, mode: &str) -> io::Result<FileHandle> {
        let (reader, writer) = match mode {
            "r" => (Some(BufReader::new(File::open(path)?)), None),
            "w" => (None, Some(File::create(path)?)),
            "a" => (
                None,
                Some(OpenOptions::new().append(true).create(true).open(path)?),
            ),
            _ => {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("unknown open mode '{mode}'"),
                ));
            }
        };
        Ok(FileHandle {
            path: path.to_string(),
            reader,
            writer,
        })
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// The next line without its terminator, or `None` at EOF.
    fn read_line(&mut self) -> io::Result<Option<String>> {
        let reader = self.reader.as_mut().ok_or_else(|| {
            io::Error::new(io::ErrorKind::Other, "file is not open for reading")
        })?;
        let mut line = String::new();
        if reader.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        while line.ends_with('\n') || line.ends_with('\r') {
            line.pop();
        }
        Ok(Some(line))
    }

    fn write(&mut self, data: &str) -> io::Result<usize> {
        let writer = self.writer.as_mut().ok_or_else(|| {
            io::Error::new(io::ErrorKind::Other, "file is not open for writing")
        })?;
        writer.write_all(data.as_bytes())?;
        Ok(data.len())
    }

    fn close(&mut self) {
        self.reader = None;
        self.writer = None;
    }
}

pub fn invoke_method(
    receiver: &Rc<RefCell<FileHandle>>,
    method: &str,
    token: &Token,
    env: &Env,
    args: &[Value],
) -> Option<Value> {
    match method {
        "methods" => Some(methods_value(METHODS, "file", env)),
        "read" => Some(match receiver.borrow_mut().read_line() {
            Ok(Some(line)) => Value::String(line),
            Ok(None) => Value::Null,
            Err(error) => Value::error_at(token, format!("read failed: {error}")),
        }),
        "write" => {
            if let Some(error) = expect_method_arity("write", token, args, 1) {
                return Some(error);
            }
            let data = args[0].inspect();
            Some(match receiver.borrow_mut().write(&data) {
                Ok(written) => Value::Integer(written as i64),
                Err(error) => Value::error_at(token, format!("write failed: {error}")),
            })
        }
        "close" => {
            receiver.borrow_mut().close();
            Some(Value::Boolean(true))
        }
        _ => None,
    }
}
