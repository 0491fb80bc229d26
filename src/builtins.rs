use std::time::{SystemTime, UNIX_EPOCH};

use crate::environment::Environment;
use crate::treewalk_interpreter::Interpreter;
use crate::value::{NativeFunction, Value};

/*
Arity checking is done in the interpreter prior to calling a builtin function.
*/

/// Binds every native function into `globals`.
pub fn define_globals(globals: &mut Environment) {
    let natives = [NativeFunction {
        name: String::from("clock"),
        arity: 0,
        callable: clock,
    }];

    for native in natives {
        let name = native.name.clone();
        globals.define_builtin(&name, Value::NativeFunction(native));
    }
}

/// Wall-clock seconds since the Unix epoch.
pub fn clock(_interpreter: &mut Interpreter, _args: &[Value]) -> Result<Value, String> {
    let since_the_epoch = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|err| format!("System clock is before the Unix epoch: {}.", err))?;

    Ok(Value::Number(since_the_epoch.as_secs_f64()))
}
