use super::*;

/// An iterator obtained through `@@iterator`, with its `next` method
/// cached as the protocol requires.
pub(crate) struct IteratorRecord {
    pub(crate) iterator: JsValue,
    next_method: JsValue,
    pub(crate) done: bool,
}

impl Interpreter {
    // §7.4.3 GetIterator
    pub(crate) fn get_iterator(&mut self, value: &JsValue) -> JsResult<IteratorRecord> {
        let symbol = self.intrinsics.symbol_iterator.clone();
        let Some(method) = self.get_method(value, symbol)? else {
            let shown = describe_value(value);
            return Err(self.create_type_error(&format!("{shown} is not iterable")));
        };
        let iterator = self.call(&method, value, &[])?;
        if !iterator.is_object() {
            return Err(
                self.create_type_error("Result of the Symbol.iterator method is not an object")
            );
        }
        let next_method = self.get_v(&iterator, "next")?;
        Ok(IteratorRecord {
            iterator,
            next_method,
            done: false,
        })
    }

    /// IteratorStep + IteratorValue. `None` once the iterator reports done.
    pub(crate) fn iterator_step(&mut self, record: &mut IteratorRecord) -> JsResult<Option<JsValue>> {
        let result = match self.call(&record.next_method.clone(), &record.iterator.clone(), &[]) {
            Ok(r) => r,
            Err(e) => {
                record.done = true;
                return Err(e);
            }
        };
        if !result.is_object() {
            record.done = true;
            return Err(self.create_type_error(&format!(
                "Iterator result {result} is not an object"
            )));
        }
        let done = match self.get_v(&result, "done") {
            Ok(d) => to_boolean(&d),
            Err(e) => {
                record.done = true;
                return Err(e);
            }
        };
        if done {
            record.done = true;
            return Ok(None);
        }
        match self.get_v(&result, "value") {
            Ok(v) => Ok(Some(v)),
            Err(e) => {
                record.done = true;
                Err(e)
            }
        }
    }

    /// IteratorClose: calls `return` when a loop is left early. A throw
    /// completion wins over anything `return` does.
    pub(crate) fn iterator_close(&mut self, record: &IteratorRecord, completion: Completion) -> Completion {
        let iterator = record.iterator.clone();
        let return_method = self.get_method(&iterator, "return");
        if matches!(completion, Completion::Throw(_)) {
            if let Ok(Some(method)) = return_method {
                let _ = self.call(&method, &iterator, &[]);
            }
            return completion;
        }
        let method = match return_method {
            Ok(Some(m)) => m,
            Ok(None) => return completion,
            Err(e) => return Completion::Throw(e),
        };
        match self.call(&method, &iterator, &[]) {
            Err(e) => Completion::Throw(e),
            Ok(inner) if !inner.is_object() => Completion::Throw(self.create_type_error(&format!(
                "Iterator result {inner} is not an object"
            ))),
            Ok(_) => completion,
        }
    }

    /// Drains an iterable, as spread and array destructuring do.
    pub(crate) fn iterate_to_list(&mut self, value: &JsValue) -> JsResult<Vec<JsValue>> {
        let mut record = self.get_iterator(value)?;
        let mut values = Vec::new();
        while let Some(v) = self.iterator_step(&mut record)? {
            values.push(v);
        }
        Ok(values)
    }

    pub(crate) fn create_iter_result_object(&mut self, value: JsValue, done: bool) -> JsValue {
        let result = self.create_object();
        let data = self.get_object(&result);
        let mut r = data.borrow_mut();
        r.insert_value("value".into_property_key(), value);
        r.insert_value("done".into_property_key(), JsValue::Boolean(done));
        JsValue::Object(result)
    }

    pub(crate) fn length_of_array_like(&mut self, obj: &JsObject) -> JsResult<u64> {
        let len = self.get(obj, "length")?;
        Ok(self.to_length(&len)? as u64)
    }

    pub(crate) fn create_list_from_array_like(&mut self, value: &JsValue) -> JsResult<Vec<JsValue>> {
        let obj = match value {
            JsValue::Undefined | JsValue::Null => return Ok(Vec::new()),
            JsValue::Object(o) => *o,
            _ => {
                return Err(self.create_type_error("CreateListFromArrayLike called on non-object"));
            }
        };
        let len = self.length_of_array_like(&obj)?;
        (0..len).map(|i| self.get(&obj, i)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::cell::Cell;

    fn numbers(values: &[JsValue]) -> Vec<f64> {
        values.iter().filter_map(JsValue::as_number).collect()
    }

    #[test]
    fn arrays_and_strings_iterate() {
        let mut interp = Interpreter::new();
        let arr = interp.create_array(vec![JsValue::Number(1.0), JsValue::Number(2.0)]);
        let values = interp.iterate_to_list(&arr).unwrap();
        assert_eq!(numbers(&values), vec![1.0, 2.0]);
        let err = interp.iterate_to_list(&JsValue::Number(3.0)).unwrap_err();
        assert_eq!(interp.format_value(&err), "TypeError: 3 is not iterable");
    }

    #[test]
    fn close_calls_return_on_early_exit() {
        let mut interp = Interpreter::new();
        let closed = Rc::new(Cell::new(0));
        let iterable = interp.create_object();
        let iterator = interp.create_object();
        let next = interp.create_native_function("next", 0, |interp, _, _| {
            Completion::Normal(interp.create_iter_result_object(JsValue::Number(1.0), false))
        });
        let counter = closed.clone();
        let ret = interp.create_native_function("return", 0, move |interp, _, _| {
            counter.set(counter.get() + 1);
            Completion::Normal(JsValue::Object(interp.create_object()))
        });
        interp.create_data_property(&iterator, "next", next).unwrap();
        interp.create_data_property(&iterator, "return", ret).unwrap();
        let iter_value = JsValue::Object(iterator);
        let get_iter = interp.create_native_function("[Symbol.iterator]", 0, move |_, _, _| {
            Completion::Normal(iter_value.clone())
        });
        let symbol = interp.intrinsics.symbol_iterator.clone();
        interp.create_data_property(&iterable, symbol, get_iter).unwrap();

        let mut record = interp.get_iterator(&JsValue::Object(iterable)).unwrap();
        let first = interp.iterator_step(&mut record).unwrap();
        assert_eq!(first.and_then(|v| v.as_number()), Some(1.0));
        let done = interp.iterator_close(&record, Completion::Break(None));
        assert!(matches!(done, Completion::Break(None)));
        assert_eq!(closed.get(), 1);

        let thrown = JsValue::from("original");
        let kept = interp.iterator_close(&record, Completion::Throw(thrown));
        assert!(matches!(kept, Completion::Throw(JsValue::String(ref s)) if s.to_rust_string() == "original"));
        assert_eq!(closed.get(), 2);
    }

    #[test]
    fn array_like_lists() {
        let mut interp = Interpreter::new();
        let obj = interp.create_object();
        interp.create_data_property(&obj, "length", JsValue::from("2")).unwrap();
        interp.create_data_property(&obj, 0u32, JsValue::Number(7.0)).unwrap();
        let list = interp.create_list_from_array_like(&JsValue::Object(obj)).unwrap();
        assert_eq!(list.len(), 2);
        assert!(list[1].is_undefined());
        assert!(interp.create_list_from_array_like(&JsValue::Number(1.0)).is_err());
    }
}
