use super::*;

/// Arena of every object an interpreter has allocated. Handles are indices
/// and stay valid for the engine's lifetime; nothing is reclaimed.
#[derive(Default)]
pub(crate) struct Heap {
    objects: Vec<Rc<RefCell<JsObjectData>>>,
}

impl Heap {
    pub(crate) fn allocate(&mut self, mut data: JsObjectData) -> JsObject {
        let id = self.objects.len() as u64;
        data.id = id;
        self.objects.push(Rc::new(RefCell::new(data)));
        JsObject { id }
    }

    pub(crate) fn get(&self, obj: &JsObject) -> Rc<RefCell<JsObjectData>> {
        match self.objects.get(obj.id as usize) {
            Some(slot) => slot.clone(),
            None => panic!("object handle #{} does not belong to this heap", obj.id),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.objects.len()
    }
}

impl Interpreter {
    pub(crate) fn allocate_object(&mut self, data: JsObjectData) -> JsObject {
        self.heap.allocate(data)
    }

    pub(crate) fn get_object(&self, obj: &JsObject) -> Rc<RefCell<JsObjectData>> {
        self.heap.get(obj)
    }

    /// Number of objects allocated so far.
    pub fn heap_size(&self) -> usize {
        self.heap.len()
    }

    pub fn create_object(&mut self) -> JsObject {
        let proto = self.get_object(&self.intrinsics.object_prototype);
        self.allocate_object(JsObjectData::new(Some(proto)))
    }

    pub fn create_object_with_proto(&mut self, proto: Option<&JsObject>) -> JsObject {
        let proto = proto.map(|p| self.get_object(p));
        self.allocate_object(JsObjectData::new(proto))
    }

    pub(crate) fn create_object_of_kind(&mut self, proto: &JsObject, kind: ObjectKind) -> JsObject {
        let mut data = JsObjectData::new(Some(self.get_object(proto)));
        data.kind = kind;
        self.allocate_object(data)
    }

    pub fn create_array(&mut self, values: Vec<JsValue>) -> JsValue {
        let elements = ArrayElements::from_slots(
            values
                .into_iter()
                .map(|v| Some(PropertyDescriptor::data_default(v)))
                .collect(),
        );
        let proto = self.intrinsics.array_prototype;
        JsValue::Object(self.create_object_of_kind(&proto, ObjectKind::Array(elements)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handles_are_sequential_and_stable() {
        let mut heap = Heap::default();
        let a = heap.allocate(JsObjectData::new(None));
        let b = heap.allocate(JsObjectData::new(None));
        assert_eq!(a.id + 1, b.id);
        assert_eq!(heap.get(&b).borrow().id, b.id);
        assert_eq!(heap.len(), 2);
    }

    #[test]
    #[should_panic(expected = "does not belong")]
    fn foreign_handle_is_an_internal_fault() {
        let heap = Heap::default();
        heap.get(&JsObject { id: 7 });
    }
}
