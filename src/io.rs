//! Per-thread replacements for the process streams.
//!
//! Commands write through [`print`] and [`eprint`] and read through [`read_line`]. By
//! default these go to the process streams; [`redirect`] swaps in other streams until the
//! returned guard is dropped, so an embedding host (a remote shell, a test) can capture a
//! single `execute` call.
//!
//! ```
//! use argdeco::io::{self, Capture, Streams};
//!
//! let out = Capture::default();
//! {
//!     let _guard = io::redirect(Streams { stdout: Some(out.output()), ..Streams::default() });
//!     io::print("hello\n").unwrap();
//! }
//! assert_eq!(out.contents(), "hello\n");
//! ```

use std::{
    cell::RefCell,
    convert::Infallible,
    fmt,
    io::{self, BufRead, Cursor, Write},
    rc::Rc,
    str::FromStr,
};

thread_local! {
    static STACK: RefCell<Vec<Streams>> = const { RefCell::new(Vec::new()) };
}

/// A set of replacement streams; `None` keeps whatever is active below.
#[derive(Clone, Default)]
pub struct Streams {
    pub stdin: Option<Input>,
    pub stdout: Option<Output>,
    pub stderr: Option<Output>,
}

impl Streams {
    pub fn is_empty(&self) -> bool {
        self.stdin.is_none() && self.stdout.is_none() && self.stderr.is_none()
    }
}

impl fmt::Debug for Streams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Streams")
            .field("stdin", &self.stdin.is_some())
            .field("stdout", &self.stdout.is_some())
            .field("stderr", &self.stderr.is_some())
            .finish()
    }
}

#[derive(Clone)]
pub struct Input(Rc<RefCell<dyn BufRead>>);

impl Input {
    pub fn new(reader: impl BufRead + 'static) -> Input {
        Input(Rc::new(RefCell::new(reader)))
    }
}

impl FromStr for Input {
    type Err = Infallible;

    fn from_str(text: &str) -> Result<Input, Infallible> {
        Ok(Input::from(text))
    }
}

impl From<&str> for Input {
    fn from(text: &str) -> Input {
        Input::new(Cursor::new(text.as_bytes().to_vec()))
    }
}

impl From<String> for Input {
    fn from(text: String) -> Input {
        Input::new(Cursor::new(text.into_bytes()))
    }
}

#[derive(Clone)]
pub struct Output(Rc<RefCell<dyn Write>>);

impl Output {
    pub fn new(writer: impl Write + 'static) -> Output {
        Output(Rc::new(RefCell::new(writer)))
    }
}

/// An in-memory sink; clones share the buffer.
#[derive(Debug, Clone, Default)]
pub struct Capture(Rc<RefCell<Vec<u8>>>);

impl Capture {
    pub fn output(&self) -> Output {
        Output::new(self.clone())
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.borrow()).into_owned()
    }

    /// Returns the contents and empties the buffer.
    pub fn take(&self) -> String {
        let buf = std::mem::take(&mut *self.0.borrow_mut());
        String::from_utf8_lossy(&buf).into_owned()
    }
}

impl Write for Capture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Restores the previous streams when dropped.
#[must_use]
pub struct Redirect {
    depth: usize,
}

impl Drop for Redirect {
    fn drop(&mut self) {
        STACK.with(|it| it.borrow_mut().truncate(self.depth - 1));
    }
}

pub fn redirect(streams: Streams) -> Redirect {
    let depth = STACK.with(|it| {
        let mut stack = it.borrow_mut();
        stack.push(streams);
        stack.len()
    });
    Redirect { depth }
}

fn active<T>(f: impl Fn(&Streams) -> Option<T>) -> Option<T> {
    STACK.with(|it| it.borrow().iter().rev().find_map(f))
}

pub fn with_stdout<T>(f: impl FnOnce(&mut dyn Write) -> T) -> T {
    match active(|it| it.stdout.clone()) {
        Some(out) => f(&mut *out.0.borrow_mut()),
        None => f(&mut io::stdout().lock()),
    }
}

pub fn with_stderr<T>(f: impl FnOnce(&mut dyn Write) -> T) -> T {
    match active(|it| it.stderr.clone()) {
        Some(out) => f(&mut *out.0.borrow_mut()),
        None => f(&mut io::stderr().lock()),
    }
}

pub fn print(text: &str) -> io::Result<()> {
    with_stdout(|it| {
        it.write_all(text.as_bytes())?;
        it.flush()
    })
}

pub fn eprint(text: &str) -> io::Result<()> {
    with_stderr(|it| {
        it.write_all(text.as_bytes())?;
        it.flush()
    })
}

/// One line including the terminator, empty at the end of input.
pub fn read_line() -> io::Result<String> {
    let mut buf = String::new();
    match active(|it| it.stdin.clone()) {
        Some(input) => input.0.borrow_mut().read_line(&mut buf)?,
        None => io::stdin().lock().read_line(&mut buf)?,
    };
    Ok(buf)
}
