use std::fmt;

/// Arguments of a façade call, rendered for the call log.
///
/// Display flattens nested groups recursively as `key=value` pairs joined
/// by commas, so `a=1` and `b={x:2,y:3}` render as `a=1,b=x=2,y=3`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallArgs(Vec<(String, ArgValue)>);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgValue {
    Scalar(String),
    Nested(CallArgs),
}

impl CallArgs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arg(mut self, name: impl Into<String>, value: impl fmt::Display) -> Self {
        self.0.push((name.into(), ArgValue::Scalar(value.to_string())));
        self
    }

    pub fn nested(mut self, name: impl Into<String>, args: CallArgs) -> Self {
        self.0.push((name.into(), ArgValue::Nested(args)));
        self
    }

    /// A sequence, keyed by position
    pub fn list<I>(self, name: impl Into<String>, items: I) -> Self
    where
        I: IntoIterator,
        I::Item: fmt::Display,
    {
        let items = items
            .into_iter()
            .enumerate()
            .fold(CallArgs::new(), |args, (idx, item)| args.arg(idx.to_string(), item));
        self.nested(name, items)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for CallArgs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, (name, value)) in self.0.iter().enumerate() {
            if idx > 0 {
                f.write_str(",")?;
            }
            write!(f, "{}=", name)?;
            match value {
                ArgValue::Scalar(value) => f.write_str(value)?,
                ArgValue::Nested(args) => write!(f, "{}", args)?,
            }
        }
        Ok(())
    }
}
