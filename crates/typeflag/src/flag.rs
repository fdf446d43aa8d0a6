//! Flags, their caller-owned storage, and the scopes that hold them.

use std::cell::{Cell, Ref, RefCell};
use std::fmt;
use std::net::IpAddr;
use std::path::PathBuf;
use std::rc::Rc;
use std::time::Duration;

use chrono::{DateTime, FixedOffset};
use indexmap::IndexMap;
use url::Url;
use uuid::Uuid;

use crate::error::{FlagName, ParseError, RegistrationError};
use crate::validate::{self, Validator};
use crate::value::{FlagType, FlagValue, MacAddr, Value};

pub(crate) const HELP_LONG: &str = "help";
pub(crate) const HELP_SHORT: &str = "h";

/// Shared storage for a flag's value.
///
/// The caller creates the slot with its default value, hands a reference to
/// a [`Flag`] constructor and keeps its own handle to read the parsed value.
pub struct Slot<T>(Rc<RefCell<T>>);

impl<T> Slot<T> {
    pub fn new(value: T) -> Self {
        Self(Rc::new(RefCell::new(value)))
    }

    pub fn set(&self, value: T) {
        *self.0.borrow_mut() = value;
    }

    pub fn borrow(&self) -> Ref<'_, T> {
        self.0.borrow()
    }
}

impl<T: Clone> Slot<T> {
    pub fn get(&self) -> T {
        self.0.borrow().clone()
    }
}

impl<T> Clone for Slot<T> {
    fn clone(&self) -> Self {
        Self(Rc::clone(&self.0))
    }
}

impl<T: Default> Default for Slot<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: fmt::Debug> fmt::Debug for Slot<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Slot").field(&*self.0.borrow()).finish()
    }
}

/// Type-erased access to a `Slot<T>`.
trait Store {
    fn accepts(&self, kind: FlagType) -> bool;
    fn store(&self, value: Value);
    fn load(&self) -> Value;
}

impl<T: FlagValue> Store for Slot<T> {
    fn accepts(&self, kind: FlagType) -> bool {
        T::KINDS.contains(&kind)
    }

    fn store(&self, value: Value) {
        if let Some(value) = T::from_value(value) {
            self.set(value);
        }
    }

    fn load(&self) -> Value {
        self.borrow().to_value()
    }
}

/// Strip whitespace and any leading dashes from a flag name.
fn normalize(raw: &str) -> String {
    raw.trim().trim_start_matches('-').to_string()
}

/// One registered flag.
pub struct Flag {
    long: String,
    short: Option<String>,
    kind: FlagType,
    store: Box<dyn Store>,
    default: Value,
    usage: String,
    required: bool,
    validators: Vec<Validator>,
    seen: Cell<bool>,
}

impl Flag {
    /// Create a flag of any kind whose values fit in `T`.
    ///
    /// Registration fails with [`RegistrationError::StorageMismatch`] when
    /// `T` cannot hold values of `kind`; the typed constructors below can't.
    pub fn new<T: FlagValue>(
        kind: FlagType,
        long: &str,
        short: &str,
        slot: &Slot<T>,
        usage: &str,
    ) -> Self {
        let short = normalize(short);
        Self {
            long: normalize(long),
            short: (!short.is_empty()).then_some(short),
            kind,
            default: slot.borrow().to_value(),
            store: Box::new(slot.clone()),
            usage: usage.trim().to_string(),
            required: false,
            validators: Vec::new(),
            seen: Cell::new(false),
        }
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    /// Add a validator. Validators run in the order they were added.
    pub fn validate<F>(mut self, check: F) -> Self
    where
        F: Fn(&Value) -> Result<(), String> + 'static,
    {
        self.validators.push(Box::new(check));
        self
    }

    pub fn long(&self) -> &str {
        &self.long
    }

    pub fn short(&self) -> Option<&str> {
        self.short.as_deref()
    }

    pub fn kind(&self) -> FlagType {
        self.kind
    }

    pub fn usage(&self) -> &str {
        &self.usage
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    /// The storage's value at the time the flag was created.
    pub fn default_value(&self) -> &Value {
        &self.default
    }

    /// The storage's current value.
    pub fn value(&self) -> Value {
        self.store.load()
    }

    /// Whether the last parse supplied a value for this flag.
    pub fn is_set(&self) -> bool {
        self.seen.get()
    }

    pub fn name(&self) -> FlagName {
        FlagName {
            long: self.long.clone(),
            short: self.short.clone(),
        }
    }

    pub(crate) fn is_help(&self) -> bool {
        self.long == HELP_LONG
    }

    /// Validate a coerced value, then store it and mark the flag as seen.
    /// Storage is left untouched when a validator fails.
    pub(crate) fn accept(&self, value: Value) -> Result<(), ParseError> {
        validate::apply(&self.validators, &value).map_err(|message| ParseError::Validation {
            flag: self.name(),
            message,
        })?;
        tracing::trace!(flag = %self.long, value = %value, "stored flag value");
        self.store.store(value);
        self.seen.set(true);
        Ok(())
    }
}

impl fmt::Debug for Flag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Flag")
            .field("long", &self.long)
            .field("short", &self.short)
            .field("kind", &self.kind)
            .field("usage", &self.usage)
            .field("required", &self.required)
            .field("validators", &self.validators.len())
            .field("seen", &self.seen.get())
            .finish_non_exhaustive()
    }
}

macro_rules! typed_constructors {
    ($($fn_name:ident: $ty:ty => $kind:ident;)+) => {
        impl Flag {
            $(
                pub fn $fn_name(long: &str, short: &str, slot: &Slot<$ty>, usage: &str) -> Self {
                    Self::new(FlagType::$kind, long, short, slot, usage)
                }
            )+
        }
    };
}

typed_constructors! {
    string: String => String;
    int: i32 => Int;
    int64: i64 => Int64;
    float32: f32 => Float32;
    float64: f64 => Float64;
    bool: bool => Bool;
    rune: char => Rune;
    duration: Duration => Duration;
    string_list: Vec<String> => StringList;
    int_list: Vec<i32> => IntList;
    timestamp: DateTime<FixedOffset> => Timestamp;
    ip_address: IpAddr => IpAddress;
    mac_address: MacAddr => MacAddress;
    url: Url => Url;
    uuid: Uuid => Uuid;
    host_port: String => HostPortPair;
    email: String => Email;
    file_path: PathBuf => FilePath;
    dir_path: PathBuf => DirPath;
}

/// An ordered set of flags: the global scope or one subcommand's.
///
/// Every scope starts with the `--help`/`-h` flag at index 0.
#[derive(Debug)]
pub struct Scope {
    name: String,
    flags: IndexMap<String, Flag>,
}

impl Scope {
    pub(crate) fn new(name: &str) -> Self {
        let help = Flag::bool(
            HELP_LONG,
            HELP_SHORT,
            &Slot::new(false),
            "Print help message and exit",
        );
        let mut flags = IndexMap::new();
        flags.insert(HELP_LONG.to_string(), help);
        Self {
            name: name.to_string(),
            flags,
        }
    }

    /// `global` or the owning subcommand's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn register(&mut self, flag: Flag) -> Result<(), RegistrationError> {
        if flag.long.is_empty() {
            return Err(RegistrationError::EmptyFlagName);
        }
        if !flag.store.accepts(flag.kind) {
            return Err(RegistrationError::StorageMismatch {
                long: flag.long,
                kind: flag.kind,
            });
        }
        if self.flags.contains_key(&flag.long) {
            return Err(RegistrationError::DuplicateFlag {
                scope: self.name.clone(),
                long: flag.long,
            });
        }
        if let Some(short) = flag.short()
            && let Some(other) = self.flags.values().find(|f| f.short() == Some(short))
        {
            tracing::warn!(
                scope = %self.name,
                short,
                "-{short} is used by both --{} and --{}; --{} wins",
                other.long,
                flag.long,
                other.long
            );
        }
        self.flags.insert(flag.long.clone(), flag);
        Ok(())
    }

    /// Find a flag by long name, falling back to the short name.
    pub fn lookup(&self, name: &str) -> Option<&Flag> {
        self.flags
            .get(name)
            .or_else(|| self.flags.values().find(|f| f.short() == Some(name)))
    }

    /// All flags in registration order, starting with `help`.
    pub fn flags(&self) -> impl ExactSizeIterator<Item = &Flag> {
        self.flags.values()
    }

    /// Current value of the flag registered as `long`.
    ///
    /// Returns `None` when there is no such flag or `T` is not its storage type.
    pub fn get<T: FlagValue>(&self, long: &str) -> Option<T> {
        self.flags.get(long).and_then(|f| T::from_value(f.value()))
    }

    pub fn is_set(&self, long: &str) -> bool {
        self.flags.get(long).is_some_and(Flag::is_set)
    }

    pub(crate) fn reset(&self) {
        for flag in self.flags.values() {
            flag.seen.set(false);
        }
    }

    pub(crate) fn check_required(&self) -> Result<(), ParseError> {
        match self.flags.values().find(|f| f.required && !f.is_set()) {
            Some(flag) => Err(ParseError::MissingRequired { flag: flag.name() }),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_normalized() {
        let slot = Slot::new(String::new());
        let flag = Flag::string(" --name ", "-n", &slot, "  Your name ");
        assert_eq!(flag.long(), "name");
        assert_eq!(flag.short(), Some("n"));
        assert_eq!(flag.usage(), "Your name");

        let flag = Flag::string("config", "", &slot, "");
        assert_eq!(flag.short(), None);
    }

    #[test]
    fn slot_is_shared_with_the_flag() {
        let slot = Slot::new(3);
        let flag = Flag::int("count", "c", &slot, "");
        flag.accept(Value::Int(7)).unwrap();
        assert_eq!(slot.get(), 7);
        assert!(flag.is_set());
        assert_eq!(flag.default_value(), &Value::Int(3));
        assert_eq!(flag.value(), Value::Int(7));
    }

    #[test]
    fn failed_validation_leaves_storage_untouched() {
        let slot = Slot::new(5);
        let flag = Flag::int("count", "", &slot, "").validate(validate::max(10));
        let err = flag.accept(Value::Int(11)).unwrap_err();
        assert!(matches!(err, ParseError::Validation { .. }), "{err}");
        assert_eq!(slot.get(), 5);
        assert!(!flag.is_set());
    }

    #[test]
    fn help_flag_comes_first() {
        let scope = Scope::new("global");
        let first = scope.flags().next().unwrap();
        assert_eq!(first.long(), "help");
        assert_eq!(first.short(), Some("h"));
        assert_eq!(first.kind(), FlagType::Bool);
        assert!(first.is_help());
    }

    #[test]
    fn register_rejects_contract_violations() {
        let mut scope = Scope::new("global");
        let name = Slot::new(String::new());

        assert_eq!(
            scope.register(Flag::string("--", "", &name, "")),
            Err(RegistrationError::EmptyFlagName)
        );

        scope.register(Flag::string("name", "n", &name, "")).unwrap();
        assert_eq!(
            scope.register(Flag::email("name", "", &name, "")),
            Err(RegistrationError::DuplicateFlag {
                scope: "global".into(),
                long: "name".into()
            })
        );
        assert_eq!(
            scope.register(Flag::new(FlagType::Int, "port", "", &name, "")),
            Err(RegistrationError::StorageMismatch {
                long: "port".into(),
                kind: FlagType::Int
            })
        );
        assert_eq!(
            scope.register(Flag::bool("help", "", &Slot::new(false), "")),
            Err(RegistrationError::DuplicateFlag {
                scope: "global".into(),
                long: "help".into()
            })
        );
    }

    #[test]
    fn lookup_prefers_long_names() {
        let mut scope = Scope::new("global");
        let a = Slot::new(false);
        let b = Slot::new(false);
        scope.register(Flag::bool("v", "x", &a, "")).unwrap();
        scope.register(Flag::bool("verbose", "v", &b, "")).unwrap();

        assert_eq!(scope.lookup("v").map(Flag::long), Some("v"));
        assert_eq!(scope.lookup("x").map(Flag::long), Some("v"));
        assert_eq!(scope.lookup("verbose").map(Flag::long), Some("verbose"));
        assert!(scope.lookup("quiet").is_none());
    }

    #[test]
    fn duplicate_short_names_resolve_to_the_first() {
        let mut scope = Scope::new("global");
        let a = Slot::new(String::new());
        let b = Slot::new(String::new());
        scope.register(Flag::string("name", "n", &a, "")).unwrap();
        scope.register(Flag::string("number", "n", &b, "")).unwrap();
        assert_eq!(scope.lookup("n").map(Flag::long), Some("name"));
    }

    #[test]
    fn required_check_names_the_first_missing_flag() {
        let mut scope = Scope::new("greet");
        let name = Slot::new(String::new());
        scope
            .register(Flag::string("name", "n", &name, "").required(true))
            .unwrap();

        match scope.check_required() {
            Err(ParseError::MissingRequired { flag }) => assert_eq!(flag.long, "name"),
            other => panic!("expected missing required flag, got {other:?}"),
        }

        scope.lookup("name").unwrap().accept(Value::String("Abiira".into())).unwrap();
        assert!(scope.check_required().is_ok());
        assert!(scope.is_set("name"));

        scope.reset();
        assert!(!scope.is_set("name"));
        assert!(scope.check_required().is_err());
    }

    #[test]
    fn typed_get() {
        let mut scope = Scope::new("global");
        let timeout = Slot::new(Duration::from_secs(5));
        scope.register(Flag::duration("timeout", "t", &timeout, "")).unwrap();

        assert_eq!(scope.get::<Duration>("timeout"), Some(Duration::from_secs(5)));
        assert_eq!(scope.get::<String>("timeout"), None);
        assert_eq!(scope.get::<bool>("help"), Some(false));
        assert_eq!(scope.get::<bool>("missing"), None);
    }
}
